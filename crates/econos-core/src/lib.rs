//! Task Manager and state machine (C6, C8): the only component that
//! mutates a canonical `Task`.

mod error;
mod manager;
mod state_machine;

pub use error::TaskManagerError;
pub use manager::TaskManager;
pub use state_machine::{can_complete, can_refund, is_active, is_legal_transition, is_terminal};
