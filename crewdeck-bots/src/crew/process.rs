//! Crew execution: sequential and manager-directed (hierarchical) runs.
//!
//! Delegation is exposed to the model as two tools, `delegate_work` and
//! `ask_question`. A tool call runs the named coworker as a nested agent
//! conversation and feeds its answer back as the tool result.

use futures::future::{BoxFuture, FutureExt};
use serde_json::json;

use super::errors::{CrewError, CrewResult};
use super::types::{Agent, CrewOutput, OutputSchema, Task, TaskOutput};
use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::llm::{ChatModel, ContentBlock, Message, ToolDef, ToolResultBlock, ToolUseBlock};

/// Nesting limit for coworkers that delegate further.
pub const MAX_DELEGATION_DEPTH: usize = 2;

const MAX_TOKENS: u32 = 4096;
const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// How a crew routes its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Process {
    /// Each task goes straight to its assigned agent.
    Sequential,
    /// Each task goes to the manager, who delegates to the crew.
    Hierarchical { manager: Agent },
}

/// A group of agents working through a list of tasks.
#[derive(Debug, Clone)]
pub struct Crew {
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    pub process: Process,
    pub max_iterations: usize,
}

impl Crew {
    pub fn sequential(agents: Vec<Agent>, tasks: Vec<Task>) -> Self {
        Self {
            agents,
            tasks,
            process: Process::Sequential,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn hierarchical(agents: Vec<Agent>, tasks: Vec<Task>, manager: Agent) -> Self {
        Self {
            agents,
            tasks,
            process: Process::Hierarchical { manager },
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn manager(&self) -> Option<&Agent> {
        match &self.process {
            Process::Hierarchical { manager } => Some(manager),
            Process::Sequential => None,
        }
    }

    /// Find a crew member by role, ignoring case and surrounding whitespace.
    pub fn agent(&self, role: &str) -> Option<&Agent> {
        let wanted = role.trim();
        self.agents
            .iter()
            .find(|a| a.role.eq_ignore_ascii_case(wanted))
    }

    pub fn task_mut(&mut self, index: usize) -> Option<&mut Task> {
        self.tasks.get_mut(index)
    }

    /// Run every task in order. Earlier answers are passed as context to
    /// later tasks.
    pub async fn kickoff<M: ChatModel + ?Sized>(&self, llm: &M) -> CrewResult<CrewOutput> {
        let mut output = CrewOutput::default();

        for task in &self.tasks {
            let assignee = self
                .agent(&task.agent)
                .ok_or_else(|| CrewError::UnknownAgent(task.agent.clone()))?;

            let context = output
                .tasks
                .iter()
                .map(|t| t.raw.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR);

            tracing::info!(
                task = %truncate(&task.description, 80),
                agent = %assignee.role,
                "Starting task"
            );

            let raw = match &self.process {
                Process::Hierarchical { manager } => {
                    let prompt = manager_prompt(task, assignee, &context);
                    self.run_agent(llm, manager, prompt, 0).await?
                }
                Process::Sequential => {
                    let prompt = task_prompt(&task.description, &task.expected_output, &context);
                    self.run_agent(llm, assignee, prompt, 1).await?
                }
            };

            let json = match task.output_schema {
                Some(schema) => Some(parse_structured(llm, &raw, schema).await?),
                None => None,
            };

            tracing::info!(agent = %assignee.role, chars = raw.len(), "Task complete");
            output.tasks.push(TaskOutput {
                description: task.description.clone(),
                agent: assignee.role.clone(),
                raw,
                json,
            });
        }

        Ok(output)
    }

    /// Coworkers reachable by `agent` at `depth`. The manager (depth 0)
    /// reaches the whole crew.
    fn coworkers(&self, agent: &Agent, depth: usize) -> Vec<&Agent> {
        if depth == 0 {
            return self.agents.iter().collect();
        }
        if !agent.allow_delegation || depth >= MAX_DELEGATION_DEPTH {
            return Vec::new();
        }
        self.agents.iter().filter(|a| a.role != agent.role).collect()
    }

    /// Drive one agent's conversation until it answers without tool calls.
    fn run_agent<'a, M: ChatModel + ?Sized>(
        &'a self,
        llm: &'a M,
        agent: &'a Agent,
        prompt: String,
        depth: usize,
    ) -> BoxFuture<'a, CrewResult<String>> {
        async move {
            let coworkers = self.coworkers(agent, depth);
            let tools = if coworkers.is_empty() {
                Vec::new()
            } else {
                delegation_tools(&coworkers)
            };
            let system = agent.system_prompt();
            let mut messages = vec![Message::user(prompt)];

            for _iteration in 0..self.max_iterations {
                let resp = llm.chat(&system, &messages, &tools, MAX_TOKENS).await?;
                let tool_uses = resp.tool_uses();
                if tool_uses.is_empty() {
                    return Ok(resp.text().trim().to_string());
                }

                let blocks = resp
                    .content
                    .iter()
                    .filter(|b| !is_blank_text(b))
                    .cloned()
                    .collect();
                messages.push(Message::assistant_blocks(blocks));

                let mut results = Vec::with_capacity(tool_uses.len());
                for tu in &tool_uses {
                    results.push(self.execute_delegation(llm, agent, &coworkers, tu, depth).await?);
                }
                messages.push(Message::tool_results(results));
            }

            Err(CrewError::IterationLimit {
                role: agent.role.clone(),
                iterations: self.max_iterations,
            })
        }
        .boxed()
    }

    async fn execute_delegation<M: ChatModel + ?Sized>(
        &self,
        llm: &M,
        from: &Agent,
        coworkers: &[&Agent],
        tu: &ToolUseBlock,
        depth: usize,
    ) -> CrewResult<ToolResultBlock> {
        let field = |name: &str| tu.input[name].as_str().unwrap_or("").trim().to_string();
        let requested = field("coworker");
        let work = match tu.name.as_str() {
            "delegate_work" => field("task"),
            "ask_question" => field("question"),
            other => {
                return Ok(tool_error(tu, format!("Error: unknown tool '{other}'")));
            }
        };

        let Some(coworker) = coworkers
            .iter()
            .copied()
            .find(|a| a.role.eq_ignore_ascii_case(&requested))
        else {
            let roles: Vec<&str> = coworkers.iter().map(|a| a.role.as_str()).collect();
            tracing::warn!(
                from = %from.role,
                coworker = %requested,
                "Delegation to unknown coworker"
            );
            return Ok(tool_error(
                tu,
                format!(
                    "Error: no coworker named '{requested}'. Choose one of: {}",
                    roles.join(", ")
                ),
            ));
        };

        tracing::info!(
            from = %from.role,
            to = %coworker.role,
            tool = %tu.name,
            "Delegating"
        );

        let prompt = task_prompt(&work, "Your best complete answer.", &field("context"));
        let answer = self.run_agent(llm, coworker, prompt, depth + 1).await?;

        Ok(ToolResultBlock {
            tool_use_id: tu.id.clone(),
            content: answer,
            is_error: None,
        })
    }
}

fn is_blank_text(block: &ContentBlock) -> bool {
    matches!(block, ContentBlock::Text { text } if text.trim().is_empty())
}

fn tool_error(tu: &ToolUseBlock, content: String) -> ToolResultBlock {
    ToolResultBlock {
        tool_use_id: tu.id.clone(),
        content,
        is_error: Some(true),
    }
}

fn delegation_tools(coworkers: &[&Agent]) -> Vec<ToolDef> {
    let roles: Vec<&str> = coworkers.iter().map(|a| a.role.as_str()).collect();
    let listing = roles.join(", ");
    vec![
        ToolDef {
            name: "delegate_work".to_string(),
            description: format!(
                "Delegate a specific task to one of the following coworkers: {listing}. \
                 Give them everything they need: they know nothing about the task beyond what you write."
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "coworker": {"type": "string", "enum": roles},
                    "task": {"type": "string", "description": "The task to delegate"},
                    "context": {"type": "string", "description": "All context needed to do the task"}
                },
                "required": ["coworker", "task", "context"]
            }),
        },
        ToolDef {
            name: "ask_question".to_string(),
            description: format!(
                "Ask a specific question to one of the following coworkers: {listing}."
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "coworker": {"type": "string", "enum": roles},
                    "question": {"type": "string", "description": "The question to ask"},
                    "context": {"type": "string", "description": "All context needed to answer"}
                },
                "required": ["coworker", "question", "context"]
            }),
        },
    ]
}

fn manager_prompt(task: &Task, assignee: &Agent, context: &str) -> String {
    let mut prompt = format!(
        "Current task: {}\n\n\
         This task is assigned to your coworker '{}'. Use your tools to delegate the work \
         or ask questions, then give the final answer yourself.\n\n\
         This is the expected criteria for your final answer: {}",
        task.description, assignee.role, task.expected_output
    );
    if !context.is_empty() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }
    prompt
}

fn task_prompt(description: &str, expected_output: &str, context: &str) -> String {
    let mut prompt = format!(
        "Current task: {description}\n\n\
         This is the expected criteria for your final answer: {expected_output}"
    );
    if !context.is_empty() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }
    prompt
}

/// Parse an agent answer into `schema`, asking the model once to restate it
/// as JSON when the answer holds no valid object.
pub async fn parse_structured<M: ChatModel + ?Sized>(
    llm: &M,
    raw: &str,
    schema: OutputSchema,
) -> CrewResult<serde_json::Value> {
    let first_err = match try_parse(raw, schema) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    tracing::debug!(
        schema = schema.name(),
        error = %first_err,
        "Answer is not valid JSON, converting"
    );
    let converted = llm
        .complete(
            "You convert text into JSON. Reply with a single JSON object and nothing else.",
            &format!(
                "Convert this answer into a JSON object of the form {}:\n\n{raw}",
                schema.shape()
            ),
        )
        .await?;

    try_parse(&converted, schema).map_err(|reason| CrewError::OutputParse {
        schema: schema.name().to_string(),
        reason,
    })
}

fn try_parse(text: &str, schema: OutputSchema) -> Result<serde_json::Value, String> {
    let object = extract_json_object(text).ok_or_else(|| "no JSON object found".to_string())?;
    let value: serde_json::Value = serde_json::from_str(object).map_err(|e| e.to_string())?;
    schema.validate(value)
}

/// First balanced `{...}` in `text`, skipping braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageContent;
    use crate::testing::{delegate, text, ScriptedModel};

    fn tool_results(msg: &Message) -> Vec<ToolResultBlock> {
        match &msg.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolResult(r) => Some(r.clone()),
                    _ => None,
                })
                .collect(),
            MessageContent::Text(_) => Vec::new(),
        }
    }

    fn first_prompt(msgs: &[Message]) -> String {
        match &msgs[0].content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Blocks(_) => String::new(),
        }
    }

    fn small_crew() -> Crew {
        let backend = Agent::new("Backend Developer", "Write code", "You write backends.")
            .allow_delegation(false);
        let frontend = Agent::new("Frontend Developer", "Write code", "You write frontends.")
            .allow_delegation(false);
        let task = Task::new("Build a health endpoint", "Code only", &backend);
        let manager = Agent::new("Supervisor", "Oversee", "You supervise.");
        Crew::hierarchical(vec![backend, frontend], vec![task], manager)
    }

    #[tokio::test]
    async fn manager_delegates_to_named_coworker() {
        let crew = small_crew();
        let llm = ScriptedModel::new(vec![
            delegate("t1", "backend developer", "write GET /health"),
            text("fn health() -> &'static str { \"ok\" }"),
            text("Final: fn health() -> &'static str { \"ok\" }"),
        ]);

        let out = crew.kickoff(&llm).await.unwrap();
        assert_eq!(out.tasks.len(), 1);
        assert_eq!(out.final_raw(), "Final: fn health() -> &'static str { \"ok\" }");
        assert_eq!(out.tasks[0].agent, "Backend Developer");

        let calls = llm.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].0.starts_with("You are Supervisor."));
        assert_eq!(calls[0].2, 2, "manager gets both delegation tools");
        assert!(calls[1].0.starts_with("You are Backend Developer."));
        assert_eq!(calls[1].2, 0, "non-delegating coworker gets no tools");
        assert!(first_prompt(&calls[1].1).contains("write GET /health"));

        let results = tool_results(calls[2].1.last().unwrap());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_use_id, "t1");
        assert!(results[0].content.contains("fn health()"));
        assert_eq!(results[0].is_error, None);
    }

    #[tokio::test]
    async fn unknown_coworker_is_reported_back_to_the_model() {
        let crew = small_crew();
        let llm = ScriptedModel::new(vec![
            delegate("t1", "Database Admin", "tune indexes"),
            text("I'll do it myself."),
        ]);

        let out = crew.kickoff(&llm).await.unwrap();
        assert_eq!(out.final_raw(), "I'll do it myself.");

        let calls = llm.calls();
        let results = tool_results(calls[1].1.last().unwrap());
        assert_eq!(results[0].is_error, Some(true));
        assert!(results[0].content.contains("Database Admin"));
        assert!(results[0].content.contains("Backend Developer, Frontend Developer"));
    }

    #[tokio::test]
    async fn delegating_coworker_can_delegate_once_more() {
        let lead = Agent::new("Engineering Manager", "Get code", "You manage.");
        let dev = Agent::new("Frontend Developer", "Write code", "You write frontends.")
            .allow_delegation(false);
        let task = Task::new("Make a banner", "Code", &lead);
        let crew = Crew::hierarchical(
            vec![lead, dev],
            vec![task],
            Agent::new("Supervisor", "Oversee", "You supervise."),
        );
        let llm = ScriptedModel::new(vec![
            delegate("m1", "Engineering Manager", "get a banner built"),
            delegate("e1", "Frontend Developer", "<div> banner"),
            text("<div class=\"banner\">Hi</div>"),
            text("<div class=\"banner\">Hi</div>"),
            text("done: <div class=\"banner\">Hi</div>"),
        ]);

        let out = crew.kickoff(&llm).await.unwrap();
        assert_eq!(out.final_raw(), "done: <div class=\"banner\">Hi</div>");

        let calls = llm.calls();
        assert!(calls[1].0.starts_with("You are Engineering Manager."));
        assert_eq!(calls[1].2, 2, "delegating coworker gets tools at depth 1");
        assert!(calls[2].0.starts_with("You are Frontend Developer."));
        assert_eq!(calls[2].2, 0);
    }

    #[tokio::test]
    async fn earlier_answers_become_context() {
        let dev = Agent::new("Backend Developer", "Write code", "You write backends.")
            .allow_delegation(false);
        let tasks = vec![
            Task::new("Write the code", "Code", &dev),
            Task::new("Review the code", "Review", &dev),
        ];
        let crew = Crew::sequential(vec![dev], tasks);
        let llm = ScriptedModel::new(vec![text("fn a() {}"), text("looks fine")]);

        let out = crew.kickoff(&llm).await.unwrap();
        assert_eq!(out.tasks.len(), 2);

        let calls = llm.calls();
        let second = first_prompt(&calls[1].1);
        assert!(second.contains("Review the code"));
        assert!(second.contains("fn a() {}"));
        assert!(!first_prompt(&calls[0].1).contains("context you're working with"));
    }

    #[tokio::test]
    async fn evaluation_json_is_extracted_from_prose() {
        let evaluator = Agent::new("Code Evaluator", "Evaluate", "You evaluate.")
            .allow_delegation(false);
        let task =
            Task::new("Evaluate", "JSON", &evaluator).with_output_schema(OutputSchema::Evaluation);
        let crew = Crew::sequential(vec![evaluator], vec![task]);
        let llm = ScriptedModel::new(vec![text(
            "Here is my verdict:\n{\"task_description\": \"button {x}\", \"approved\": false, \
             \"reasoning\": \"uses #FF00FF\", \"generated_code\": \"<button>\"}\nThanks.",
        )]);

        let out = crew.kickoff(&llm).await.unwrap();
        let evals = out.evaluations().unwrap();
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].task_description, "button {x}");
        assert!(!evals[0].approved);
    }

    #[tokio::test]
    async fn unparseable_answer_gets_one_conversion_attempt() {
        let evaluator = Agent::new("Code Evaluator", "Evaluate", "You evaluate.")
            .allow_delegation(false);
        let task =
            Task::new("Evaluate", "JSON", &evaluator).with_output_schema(OutputSchema::Evaluation);
        let crew = Crew::sequential(vec![evaluator], vec![task]);

        let llm = ScriptedModel::new(vec![
            text("Not compliant: magenta background."),
            text(
                r##"{"task_description": "button", "approved": false, "reasoning": "magenta", "generated_code": ".b { color: #FF00FF }"}"##,
            ),
        ]);
        let out = crew.kickoff(&llm).await.unwrap();
        assert_eq!(out.evaluations().unwrap()[0].reasoning, "magenta");
        assert_eq!(llm.calls().len(), 2);

        let llm = ScriptedModel::new(vec![text("Not compliant."), text("still prose")]);
        let err = crew.kickoff(&llm).await.unwrap_err();
        assert!(matches!(err, CrewError::OutputParse { .. }));
    }

    #[tokio::test]
    async fn endless_delegation_hits_the_turn_cap() {
        let crew = small_crew().with_max_iterations(2);
        let llm = ScriptedModel::new(vec![
            delegate("t1", "Backend Developer", "a"),
            text("a"),
            delegate("t2", "Backend Developer", "b"),
            text("b"),
        ]);

        let err = crew.kickoff(&llm).await.unwrap_err();
        assert!(matches!(
            err,
            CrewError::IterationLimit { ref role, iterations: 2 } if role == "Supervisor"
        ));
    }

    #[tokio::test]
    async fn task_for_missing_agent_fails_before_any_call() {
        let ghost = Agent::new("Ghost", "", "");
        let dev = Agent::new("Backend Developer", "", "");
        let crew = Crew::sequential(vec![dev], vec![Task::new("x", "y", &ghost)]);
        let llm = ScriptedModel::new(vec![]);

        let err = crew.kickoff(&llm).await.unwrap_err();
        assert!(matches!(err, CrewError::UnknownAgent(ref r) if r == "Ghost"));
        assert!(llm.calls().is_empty());
    }

    #[test]
    fn json_extraction_handles_nesting_and_strings() {
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("x {\"a\": {\"b\": 1}} y"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(
            extract_json_object(r#"{"code": "} { \" }"} trailing"#),
            Some(r#"{"code": "} { \" }"}"#)
        );
        assert_eq!(extract_json_object("{ unterminated"), None);
    }
}
