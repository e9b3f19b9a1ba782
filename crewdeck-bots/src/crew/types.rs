use serde::{Deserialize, Serialize};

use super::errors::{CrewError, CrewResult};

/// Number of features the generation crew is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TaskCount(u8);

impl TaskCount {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10;

    pub fn new(n: i64) -> CrewResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&n) {
            return Err(CrewError::InvalidTaskCount(n));
        }
        Ok(Self(n as u8))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for TaskCount {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<i64> for TaskCount {
    type Error = CrewError;

    fn try_from(n: i64) -> CrewResult<Self> {
        Self::new(n)
    }
}

impl From<TaskCount> for i64 {
    fn from(count: TaskCount) -> i64 {
        count.0 as i64
    }
}

impl std::fmt::Display for TaskCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An LLM-backed team member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub allow_delegation: bool,
}

impl Agent {
    /// Agents may delegate unless told otherwise.
    pub fn new(role: &str, goal: &str, backstory: &str) -> Self {
        Self {
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
            allow_delegation: true,
        }
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// System prompt the agent speaks under.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {role}. {backstory}\nYour personal goal is: {goal}\n\n\
             When you have the final answer, reply with the answer only, without preamble.",
            role = self.role,
            backstory = self.backstory,
            goal = self.goal,
        )
    }
}

/// Structured output a task's final answer must conform to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    Evaluation,
}

impl OutputSchema {
    pub fn name(self) -> &'static str {
        match self {
            OutputSchema::Evaluation => "EvaluationResult",
        }
    }

    /// JSON shape shown to the model when asking for a conversion.
    pub fn shape(self) -> &'static str {
        match self {
            OutputSchema::Evaluation => {
                r#"{"task_description": "string", "approved": bool, "reasoning": "string", "generated_code": "string"}"#
            }
        }
    }

    /// Check a value against the schema, returning it normalized.
    pub fn validate(self, value: serde_json::Value) -> Result<serde_json::Value, String> {
        match self {
            OutputSchema::Evaluation => {
                let parsed: EvaluationResult =
                    serde_json::from_value(value).map_err(|e| e.to_string())?;
                serde_json::to_value(parsed).map_err(|e| e.to_string())
            }
        }
    }
}

/// A unit of work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    /// Role of the assigned agent.
    pub agent: String,
    pub output_schema: Option<OutputSchema>,
}

impl Task {
    pub fn new(description: &str, expected_output: &str, agent: &Agent) -> Self {
        Self {
            description: description.to_string(),
            expected_output: expected_output.to_string(),
            agent: agent.role.clone(),
            output_schema: None,
        }
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn set_description(&mut self, description: String) {
        self.description = description;
    }
}

/// Verdict on one generated snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub task_description: String,
    pub approved: bool,
    pub reasoning: String,
    pub generated_code: String,
}

/// The document written at the end of a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorOutput {
    pub result: Vec<EvaluationResult>,
}

/// What one task produced during a kickoff.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub description: String,
    pub agent: String,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
}

/// Outputs of every task, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrewOutput {
    pub tasks: Vec<TaskOutput>,
}

impl CrewOutput {
    /// Raw answer of the last task.
    pub fn final_raw(&self) -> &str {
        self.tasks.last().map(|t| t.raw.as_str()).unwrap_or("")
    }

    /// Every schema-validated evaluation produced by this kickoff.
    pub fn evaluations(&self) -> CrewResult<Vec<EvaluationResult>> {
        self.tasks
            .iter()
            .filter_map(|t| t.json.clone())
            .map(|v| serde_json::from_value(v).map_err(CrewError::from))
            .collect()
    }
}
