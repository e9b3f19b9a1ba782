//! The brand-compliance workflow: generate features, implement each one,
//! evaluate it against the guidelines and persist the verdicts.

use std::path::Path;

use crate::config::CrewConfig;
use crate::crew::team::{self, IMPLEMENT_TASK};
use crate::crew::{CrewError, CrewResult, EvaluationResult, SupervisorOutput, TaskCount};
use crate::llm::ChatModel;

/// Run both crews and write the results to `config.output`.
pub async fn run<M: ChatModel + ?Sized>(
    llm: &M,
    config: &CrewConfig,
) -> CrewResult<SupervisorOutput> {
    let generation = team::task_generation_crew(config.num_tasks)
        .with_max_iterations(config.max_iterations);
    let generated = generation.kickoff(llm).await?;
    let features = parse_generated_tasks(generated.final_raw(), config.num_tasks);
    tracing::info!(count = features.len(), "Features generated");

    let mut implementation = team::implementation_crew(&config.guidelines)
        .with_max_iterations(config.max_iterations);
    let mut output = SupervisorOutput::default();

    for (i, feature) in features.iter().enumerate() {
        tracing::info!(index = i + 1, feature = %feature, "Implementing feature");
        if let Some(task) = implementation.task_mut(IMPLEMENT_TASK) {
            task.set_description(format!("Implement this task: {feature}"));
        }
        let result = implementation.kickoff(llm).await?;
        let evaluations = result.evaluations()?;
        for eval in &evaluations {
            tracing::info!(approved = eval.approved, task = %eval.task_description, "Evaluation");
        }
        output.result.extend(evaluations);
    }

    write_output(&config.output, &output)?;
    Ok(output)
}

/// Evaluate a single snippet with the code evaluator alone.
pub async fn evaluate<M: ChatModel + ?Sized>(
    llm: &M,
    config: &CrewConfig,
    code: &str,
) -> CrewResult<EvaluationResult> {
    let crew = team::evaluation_crew(&config.guidelines, code)
        .with_max_iterations(config.max_iterations);
    let out = crew.kickoff(llm).await?;
    out.evaluations()?
        .into_iter()
        .next()
        .ok_or_else(|| CrewError::OutputParse {
            schema: "EvaluationResult".to_string(),
            reason: "evaluator produced no structured output".to_string(),
        })
}

/// Split the generator's answer into individual features.
///
/// Numbered (`1.`, `2)`) or bulleted (`-`, `*`, `•`) lines become items.
/// Numbered lines win over bullets when both appear, and only the
/// shallowest indentation counts, so sub-bullets under a feature are not
/// features themselves. Without any list markers the whole answer is one
/// feature. At most `count` items are kept.
pub fn parse_generated_tasks(text: &str, count: TaskCount) -> Vec<String> {
    let marked: Vec<ListItem<'_>> = text
        .lines()
        .filter_map(list_item)
        .filter(|item| !item.text.is_empty())
        .collect();

    let numbered = marked.iter().any(|item| item.numbered);
    let candidates: Vec<&ListItem<'_>> = marked
        .iter()
        .filter(|item| item.numbered == numbered)
        .collect();

    let mut items: Vec<String> = match candidates.iter().map(|item| item.indent).min() {
        Some(top) => candidates
            .iter()
            .filter(|item| item.indent == top)
            .map(|item| item.text.to_string())
            .collect(),
        None => {
            let whole = text.trim();
            if whole.is_empty() {
                Vec::new()
            } else {
                vec![whole.to_string()]
            }
        }
    };
    items.truncate(count.get());
    items
}

struct ListItem<'a> {
    indent: usize,
    numbered: bool,
    text: &'a str,
}

fn list_item(line: &str) -> Option<ListItem<'_>> {
    let body = line.trim_start();
    let indent = line.len() - body.len();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = body.strip_prefix(bullet) {
            return Some(ListItem {
                indent,
                numbered: false,
                text: rest.trim(),
            });
        }
    }
    let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &body[digits..];
    let rest = rest
        .strip_prefix(". ")
        .or_else(|| rest.strip_prefix(") "))
        .or_else(|| rest.strip_prefix(": "))?;
    Some(ListItem {
        indent,
        numbered: true,
        text: rest.trim(),
    })
}

/// Write the output as pretty-printed JSON.
pub fn write_output(path: &Path, output: &SupervisorOutput) -> CrewResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(output)?;
    std::fs::write(path, json)?;
    Ok(())
}
