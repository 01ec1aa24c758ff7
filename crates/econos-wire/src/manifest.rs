use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body returned by a worker's `GET /manifest`. Polled by the capability
/// index on a fixed interval; never mutated, only replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerManifest {
    pub worker: WorkerInfo,
    pub services: Vec<ServiceOffer>,
    pub protocol: ProtocolInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub address: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffer {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_wei: u128,
    pub endpoint: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolInfo {
    pub payment_header: String,
}
