//! Event demultiplexer and deadline sweeper driving a task's lifecycle to
//! its terminal states (C9 Lifecycle Monitor).

mod events;
mod monitor;

pub use events::LifecycleEvent;
pub use monitor::LifecycleMonitor;
