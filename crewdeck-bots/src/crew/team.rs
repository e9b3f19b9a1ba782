//! The two crews of the brand-compliance workflow.

use super::process::Crew;
use super::types::{Agent, OutputSchema, Task, TaskCount};

/// Index of the implement task in [`implementation_crew`].
pub const IMPLEMENT_TASK: usize = 0;
/// Index of the evaluate task in [`implementation_crew`].
pub const EVALUATE_TASK: usize = 1;

pub fn feature_generator(count: TaskCount) -> Agent {
    Agent::new(
        "Feature Generator",
        &format!(
            "Generate {count} extremely simple and short code features (like a button or a banner). Just one-liners."
        ),
        &format!(
            "You are a manager responsible for creating the ticket for {count} very basic features that will be implemented."
        ),
    )
    .allow_delegation(false)
}

pub fn task_supervisor() -> Agent {
    Agent::new(
        "Task Supervisor",
        "Oversee the generation of tasks and ensure they are simple and appropriate.",
        "You supervise the task generation process, ensuring tasks are suitable for implementation and evaluation.",
    )
}

pub fn supervisor() -> Agent {
    Agent::new(
        "Supervisor",
        "Oversee the evaluation of generated code and ensure it complies with the guidelines. DO NOT fix the code if it doesn't.",
        "You are a high-level supervisor in the company. You oversee the evaluation process and ensure all generated code respects the company brand guidelines.",
    )
}

pub fn code_evaluator(guidelines: &str) -> Agent {
    Agent::new(
        "Code Evaluator",
        &format!("Evaluate generated code for compliance with brand guidelines. Guidelines: {guidelines}"),
        "You are a meticulous code evaluator responsible for ensuring all code adheres to company standards and maintains simplicity.",
    )
    .allow_delegation(false)
}

pub fn engineering_manager() -> Agent {
    Agent::new(
        "Engineering Manager",
        "Specify the task for the developers. The tasks need to be as simple and small as possible. Once done, return the code - no need to verify anything.",
        "You're an engineering manager responsible for getting the code for the assigned task. That's your only objective.",
    )
}

pub fn backend_developer() -> Agent {
    Agent::new(
        "Backend Developer",
        "Generate code based on the manager's requirements. Keep it as simple as possible and make sure to JUST return code.",
        "You're a backend developer. You generate very basic code based on the manager's specific requirements. You share the code that you generated when you're done.",
    )
    .allow_delegation(false)
}

pub fn frontend_developer() -> Agent {
    Agent::new(
        "Frontend Developer",
        "Generate code based on the manager's requirements. Keep it as simple as possible and make sure to JUST return code.",
        "You're a frontend developer. You generate very basic code based on the manager's specific requirements. You share the code that you generated when you're done.",
    )
    .allow_delegation(false)
}

/// The evaluate task, shared by the implementation crew and the standalone
/// `evaluate` command.
pub fn evaluate_task(evaluator: &Agent, guidelines: &str) -> Task {
    Task::new(
        &format!(
            "Evaluate the generated code to see if it complies with the brand guidelines and meets the guidelines: {guidelines}. Ensure the implementation is as simple as possible."
        ),
        r#"{"task_description": "string", "approved": "bool", "reasoning": "string", "generated_code": "string"}"#,
        evaluator,
    )
    .with_output_schema(OutputSchema::Evaluation)
}

/// One feature generator and one generation task, overseen by the task
/// supervisor.
pub fn task_generation_crew(count: TaskCount) -> Crew {
    let generator = feature_generator(count);
    let generate = Task::new(
        &format!("Generate {count} extremely simple and short code features for implementation."),
        &format!("List of {count} simple tasks"),
        &generator,
    );
    Crew::hierarchical(vec![generator], vec![generate], task_supervisor())
}

/// Manager, evaluator and two developers; implement then evaluate, overseen
/// by the supervisor.
pub fn implementation_crew(guidelines: &str) -> Crew {
    let manager = engineering_manager();
    let evaluator = code_evaluator(guidelines);

    let implement = Task::new(
        "Implement a very simple feature for both backend and frontend. The feature should be as minimal as possible.",
        "Concatenated code implementing the feature for both backend and frontend",
        &manager,
    );
    let evaluate = evaluate_task(&evaluator, guidelines);

    Crew::hierarchical(
        vec![manager, evaluator, backend_developer(), frontend_developer()],
        vec![implement, evaluate],
        supervisor(),
    )
}

/// The evaluator on its own, for checking a single snippet.
pub fn evaluation_crew(guidelines: &str, code: &str) -> Crew {
    let evaluator = code_evaluator(guidelines);
    let mut task = evaluate_task(&evaluator, guidelines);
    task.set_description(format!("{}\n\nCode to evaluate:\n{code}", task.description));
    Crew::sequential(vec![evaluator], vec![task])
}
