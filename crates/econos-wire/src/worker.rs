use serde::{Deserialize, Serialize};

/// Hex-encoded mirror of an authorization signature, carried over the wire
/// to `POST /authorize/:taskId`. Deliberately distinct from any type the
/// authorization signer uses internally (see `DESIGN.md`'s note on keeping
/// the worker's result-signing context and the master's typed-data
/// authorization context unconvertible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedAuthorizationWire {
    pub task_id: String,
    pub worker: String,
    pub expires_at: u64,
    pub nonce: u64,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub payload: serde_json::Value,
    pub authorization: SignedAuthorizationWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofPayload {
    pub result_hash: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
