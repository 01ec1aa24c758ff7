use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::primitives::{Address, PrimitiveSignature, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::SolStruct;
use econos_types::TaskId;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::typed_data::{authorization_domain, AuthorizationStruct, Eip712Domain};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPayload {
    pub task_id: TaskId,
    pub worker: Address,
    pub expires_at: u64,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
    pub payload: AuthorizationPayload,
    pub signer: Address,
    pub signature: Vec<u8>,
}

impl SignedAuthorization {
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.payload.expires_at
    }
}

/// Issues domain-separated typed-data signatures binding
/// `(taskId, worker, expiresAt, nonce)`, and owns the nonce ledger
/// exclusively (C4). A `Mutex` guards the ledger rather than an
/// `RwLock`: nonce issuance is a strict read-modify-write, not a
/// read-mostly cache.
pub struct AuthorizationSigner {
    signer: PrivateKeySigner,
    domain: Eip712Domain,
    nonce_counter: AtomicU64,
    nonce_ledger: Mutex<HashMap<(TaskId, u64), Instant>>,
}

impl AuthorizationSigner {
    pub fn new(signer: PrivateKeySigner, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            domain: authorization_domain(chain_id, verifying_contract),
            signer,
            nonce_counter: AtomicU64::new(0),
            nonce_ledger: Mutex::new(HashMap::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn generate(
        &self,
        task_id: TaskId,
        worker: Address,
        validity_seconds: u64,
        now: u64,
    ) -> AuthorizationPayload {
        let nonce = self.nonce_counter.fetch_add(1, Ordering::SeqCst);
        AuthorizationPayload {
            task_id,
            worker,
            expires_at: now + validity_seconds,
            nonce,
        }
    }

    pub async fn sign(&self, payload: AuthorizationPayload) -> Result<SignedAuthorization, AuthError> {
        let key = (payload.task_id, payload.nonce);
        {
            let mut ledger = self.nonce_ledger.lock().unwrap();
            if ledger.contains_key(&key) {
                return Err(AuthError::NonceReused);
            }
            ledger.insert(key, Instant::now());
        }

        let hash = self.typed_hash(&payload);
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|_| AuthError::SignatureInvalid)?;

        Ok(SignedAuthorization {
            payload,
            signer: self.signer.address(),
            signature: signature.as_bytes().to_vec(),
        })
    }

    pub fn verify(&self, sa: &SignedAuthorization) -> bool {
        let hash = self.typed_hash(&sa.payload);
        let Ok(signature) = PrimitiveSignature::try_from(sa.signature.as_slice()) else {
            return false;
        };
        signature
            .recover_address_from_prehash(&hash)
            .map(|recovered| recovered == sa.signer)
            .unwrap_or(false)
    }

    fn typed_hash(&self, payload: &AuthorizationPayload) -> alloy::primitives::B256 {
        let message = AuthorizationStruct {
            taskId: payload.task_id.0,
            worker: payload.worker,
            expiresAt: U256::from(payload.expires_at),
            nonce: U256::from(payload.nonce),
        };
        message.eip712_signing_hash(&self.domain)
    }

    pub fn is_nonce_used(&self, task_id: TaskId, nonce: u64) -> bool {
        self.nonce_ledger.lock().unwrap().contains_key(&(task_id, nonce))
    }

    /// Reclaims nonce entries older than `age` (default 24h).
    pub fn prune_nonces_older_than(&self, age: Duration) {
        let Some(cutoff) = Instant::now().checked_sub(age) else {
            return;
        };
        self.nonce_ledger
            .lock()
            .unwrap()
            .retain(|_, issued_at| *issued_at >= cutoff);
    }

    /// Spawns a loop that reclaims nonce entries older than `retention`
    /// on a fixed tick, mirroring `CapabilityIndex::start`'s poll shape.
    /// Without this the ledger grows for as long as the process runs.
    pub fn spawn_nonce_pruner(self: &Arc<Self>, retention: Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(NONCE_PRUNE_INTERVAL).await;
                this.prune_nonces_older_than(retention);
            }
        });
    }
}

const NONCE_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

#[cfg(test)]
mod tests {
    use super::*;
    use econos_types::B256;

    fn signer(chain_id: u64, verifying_contract: Address) -> AuthorizationSigner {
        let key = PrivateKeySigner::random();
        AuthorizationSigner::new(key, chain_id, verifying_contract)
    }

    #[tokio::test]
    async fn sign_then_verify_round_trips() {
        let contract = Address::repeat_byte(0xAB);
        let s = signer(240, contract);
        let payload = s.generate(TaskId(B256::repeat_byte(1)), Address::repeat_byte(2), 3600, 1_000);
        let sa = s.sign(payload).await.unwrap();
        assert!(s.verify(&sa));
        assert!(!sa.is_expired(1_000));
        assert!(sa.is_expired(100_000));
    }

    #[tokio::test]
    async fn second_sign_with_same_nonce_is_rejected() {
        let contract = Address::repeat_byte(0xAB);
        let s = signer(240, contract);
        let payload = s.generate(TaskId(B256::repeat_byte(1)), Address::repeat_byte(2), 3600, 1_000);
        let payload_dup = payload.clone();
        s.sign(payload).await.unwrap();
        let err = s.sign(payload_dup).await.unwrap_err();
        assert!(matches!(err, AuthError::NonceReused));
    }

    #[tokio::test]
    async fn signature_fails_verification_under_different_chain_id() {
        let contract = Address::repeat_byte(0xAB);
        let signer_a = signer(240, contract);
        let payload = signer_a.generate(TaskId(B256::repeat_byte(1)), Address::repeat_byte(2), 3600, 1_000);
        let sa = signer_a.sign(payload).await.unwrap();

        let verifier_b = signer(241, contract);
        assert!(!verifier_b.verify(&sa));
    }

    #[tokio::test]
    async fn signature_fails_verification_under_different_verifying_contract() {
        let contract_x = Address::repeat_byte(0xAB);
        let contract_y = Address::repeat_byte(0xCD);
        let signer_a = signer(240, contract_x);
        let payload = signer_a.generate(TaskId(B256::repeat_byte(1)), Address::repeat_byte(2), 3600, 1_000);
        let sa = signer_a.sign(payload).await.unwrap();

        let verifier_y = signer(240, contract_y);
        assert!(!verifier_y.verify(&sa));
    }

    #[test]
    fn serialize_then_deserialize_is_identity() {
        let sa = SignedAuthorization {
            payload: AuthorizationPayload {
                task_id: TaskId(B256::repeat_byte(9)),
                worker: Address::repeat_byte(3),
                expires_at: 500,
                nonce: 7,
            },
            signer: Address::repeat_byte(4),
            signature: vec![1, 2, 3, 4],
        };
        let json = serde_json::to_string(&sa).unwrap();
        let round_tripped: SignedAuthorization = serde_json::from_str(&json).unwrap();
        assert_eq!(sa, round_tripped);
    }
}
