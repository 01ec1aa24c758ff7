//! Wire-format DTOs for the two HTTP boundaries this crate sits between:
//! the worker sidecar's manifest/authorize/proof/result surface, and the
//! orchestrator's own `/hire`/`/chat` surface. Kept separate from
//! `econos-types`'s domain model so a change to the wire format never
//! forces a change to the canonical `Task`.

mod manifest;
mod pipeline;
mod worker;

pub use manifest::{ProtocolInfo, ServiceOffer, WorkerInfo, WorkerManifest};
pub use pipeline::{ChatRequest, HireRequest, PipelineExecutionResult, StepResult};
pub use worker::{AuthorizeRequest, ProofPayload, ProofResponse, ResultResponse, SignedAuthorizationWire};
