//! Canonical data model for the Econos master agent.
//!
//! This crate carries no I/O: it is the shared vocabulary every other
//! `econos-*` crate builds on.

mod error;
mod offer;
mod plan;
mod task;

pub use error::TaskError;
pub use offer::Offer;
pub use plan::{ExecutionPlan, InputMapping, PlanStep, StepStatus};
pub use task::{
    AuthorizationRecord, ImageStyle, ResearchDepth, Task, TaskId, TaskInput, TaskStatus, TaskType,
    WriteTone,
};

pub use alloy_primitives::{Address, B256};

/// Current wall-clock time as Unix seconds, the unit every `Task` deadline
/// and timestamp field is carried in.
pub fn now_unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
