//! Typed read/write access to the escrow and registry contracts (C1).

mod alloy_gateway;
mod backoff;
mod contracts;
mod error;
mod fake;
mod gateway;

pub use alloy::primitives::{Address, B256};

pub use alloy_gateway::{connect_http, AlloyChainGateway};
pub use contracts::{IEscrow, IRegistry, OnChainStatus};
pub use error::ChainError;
pub use fake::FakeChainGateway;
pub use gateway::{ChainEvent, ChainGateway, OnChainTask, Receipt};
