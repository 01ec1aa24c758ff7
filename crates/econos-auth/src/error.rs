#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("nonce already used for this task")]
    NonceReused,

    #[error("authorization expired at {expires_at}, now is {now}")]
    AuthorizationExpired { expires_at: u64, now: u64 },

    #[error("signature does not recover to the expected signer")]
    SignatureInvalid,
}
