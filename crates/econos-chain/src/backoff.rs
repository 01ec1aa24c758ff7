use std::time::Duration;

use crate::error::ChainError;

const MAX_ATTEMPTS: u32 = 5;

/// Retries a transient RPC call with exponential backoff, bounded at
/// `MAX_ATTEMPTS`. Persistent failure surfaces as `ChainUnavailable`.
pub async fn retry_rpc<T, F, Fut>(mut op: F) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(reason) if attempt < MAX_ATTEMPTS => {
                let delay = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tracing::warn!(attempt, %reason, "transient chain RPC error, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(reason) => return Err(ChainError::ChainUnavailable(reason)),
        }
    }
}
