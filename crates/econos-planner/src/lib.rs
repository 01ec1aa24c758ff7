//! Analyzes a request into a DAG of worker-bound steps (C7 Pipeline
//! Planner). The analyzer itself is an external collaborator
//! (`PlanAnalyzer`); this crate owns resolving each step to a concrete
//! offer, computing input mappings, and enforcing the budget ceiling.

mod analyzer;
mod error;
mod planner;

pub use analyzer::{AnalyzedStep, AnalyzerOutput, InputSource, PlanAnalyzer, StubAnalyzer};
pub use error::PlannerError;
pub use planner::{PipelinePlanner, PlanOptions};
