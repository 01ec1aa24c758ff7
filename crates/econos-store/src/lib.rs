//! Persistence interface for the canonical task record (C5). The task
//! manager (`econos-core`) is the only writer; everyone else reads
//! snapshots through this trait.

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::InMemoryTaskStore;
pub use store::TaskStore;
