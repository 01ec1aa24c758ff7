//! Drives execution plans end to end and exposes the thin `/hire`/`/chat`
//! HTTP surface atop them (C10 Orchestrator).

mod error;
mod http;
mod orchestrator;

pub use error::{EconosError, OrchestratorError, WorkerError};
pub use http::{app_router, serve, AppState};
pub use orchestrator::Orchestrator;
