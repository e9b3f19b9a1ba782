//! Agent crews.
//!
//! A crew is a set of LLM-backed agents (role, goal, backstory) working a
//! list of tasks. In hierarchical mode a manager agent receives every task
//! and hands the work to coworkers through tool calls.

mod errors;
mod process;
pub mod team;
mod types;

pub use errors::{CrewError, CrewResult};
pub use process::{extract_json_object, parse_structured, Crew, Process, MAX_DELEGATION_DEPTH};
pub use types::{
    Agent, CrewOutput, EvaluationResult, OutputSchema, SupervisorOutput, Task, TaskCount,
    TaskOutput,
};
