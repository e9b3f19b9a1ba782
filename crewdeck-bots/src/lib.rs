//! crewdeck-bots: a simulated software team built from LLM agents.
//!
//! - Crews of role-playing agents with manager-directed delegation
//! - A brand-compliance workflow: generate features, implement, evaluate
//! - The Claude client shared with the supervisor dashboard

pub mod config;
pub mod crew;
pub mod llm;
pub mod workflow;

#[cfg(test)]
mod testing;
