use std::sync::Arc;

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use econos_types::TaskId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::backoff::retry_rpc;
use crate::contracts::{IEscrow, IRegistry, OnChainStatus};
use crate::error::ChainError;
use crate::gateway::{ChainEvent, ChainGateway, OnChainTask, Receipt};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Production `ChainGateway`, backed by a JSON-RPC provider with the
/// master's wallet attached for writes. Log subscription runs on a
/// background task that republishes decoded events onto a broadcast
/// channel every other component subscribes to independently.
pub struct AlloyChainGateway<P: Provider<Ethereum> + Clone + Send + Sync + 'static> {
    provider: P,
    escrow_address: Address,
    registry_address: Address,
    block_confirmations: u64,
    event_tx: broadcast::Sender<ChainEvent>,
    cancel: CancellationToken,
}

impl<P: Provider<Ethereum> + Clone + Send + Sync + 'static> AlloyChainGateway<P> {
    pub fn new(
        provider: P,
        escrow_address: Address,
        registry_address: Address,
        block_confirmations: u64,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            provider,
            escrow_address,
            registry_address,
            block_confirmations,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    fn escrow(&self) -> IEscrow::IEscrowInstance<(), P, Ethereum> {
        IEscrow::new(self.escrow_address, self.provider.clone())
    }

    fn registry(&self) -> IRegistry::IRegistryInstance<(), P, Ethereum> {
        IRegistry::new(self.registry_address, self.provider.clone())
    }

    /// Spawns the log-watching loop. On reconnect it resumes from
    /// `from_block` rather than re-scanning from genesis.
    pub fn spawn_event_loop(self: &Arc<Self>, from_block: u64) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_event_loop(from_block).await;
        });
    }

    async fn run_event_loop(&self, mut from_block: u64) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let filter = alloy::rpc::types::Filter::new()
                .address(self.escrow_address)
                .from_block(from_block);

            match self.provider.get_logs(&filter).await {
                Ok(logs) => {
                    for log in &logs {
                        if let Some(block) = log.block_number {
                            from_block = from_block.max(block + 1);
                        }
                        self.dispatch_log(log);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "event log poll failed, retrying");
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
                _ = self.cancel.cancelled() => return,
            }
        }
    }

    fn dispatch_log(&self, log: &alloy::rpc::types::Log) {
        let Ok(primitive) = log.log_decode::<IEscrow::TaskCreated>() else {
            if let Ok(completed) = log.log_decode::<IEscrow::TaskCompleted>() {
                let event = completed.inner.data;
                let _ = self.event_tx.send(ChainEvent::TaskCompleted {
                    task_id: TaskId(event.taskId),
                    result: event.result.to_vec(),
                });
                return;
            }
            if let Ok(refunded) = log.log_decode::<IEscrow::TaskRefunded>() {
                let event = refunded.inner.data;
                let _ = self.event_tx.send(ChainEvent::TaskRefunded {
                    task_id: TaskId(event.taskId),
                });
            }
            return;
        };
        let event = primitive.inner.data;
        let _ = self.event_tx.send(ChainEvent::TaskCreated {
            task_id: TaskId(event.taskId),
            master: event.master,
            worker: event.worker,
            amount: u256_to_u128(event.amount),
        });
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

fn u256_to_u128(value: U256) -> u128 {
    value.try_into().unwrap_or(u128::MAX)
}

#[async_trait]
impl<P: Provider<Ethereum> + Clone + Send + Sync + 'static> ChainGateway for AlloyChainGateway<P> {
    async fn get_task(&self, id: TaskId) -> Result<Option<OnChainTask>, ChainError> {
        let escrow = self.escrow();
        let record = retry_rpc(|| async {
            escrow
                .tasks(id.0)
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| e.to_string())
        })
        .await?;

        if record.master == Address::ZERO {
            return Ok(None);
        }
        let status = OnChainStatus::try_from(record.status)
            .map_err(|raw| ChainError::TxReverted(format!("unknown on-chain status {raw}")))?;
        Ok(Some(OnChainTask {
            master: record.master,
            worker: record.worker,
            amount: u256_to_u128(record.amount),
            deadline: record.deadline.try_into().unwrap_or(u64::MAX),
            status,
        }))
    }

    async fn deposit_task(
        &self,
        id: TaskId,
        worker: Address,
        duration_secs: u64,
        amount_wei: u128,
    ) -> Result<Receipt, ChainError> {
        if self.get_task(id).await?.is_some() {
            return Err(ChainError::TaskAlreadyExists(id.to_string()));
        }
        let escrow = self.escrow();
        let pending = escrow
            .depositTask(id.0, worker, U256::from(duration_secs))
            .value(U256::from(amount_wei))
            .send()
            .await
            .map_err(|e| ChainError::ChainUnavailable(e.to_string()))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::ChainUnavailable(e.to_string()))?;
        if !receipt.status() {
            return Err(ChainError::TxReverted("depositTask reverted".to_string()));
        }
        self.await_confirmations(receipt.block_number.unwrap_or_default(), receipt.transaction_hash)
            .await
    }

    async fn refund_and_slash(&self, id: TaskId) -> Result<Receipt, ChainError> {
        let escrow = self.escrow();
        let pending = escrow
            .refundAndSlash(id.0)
            .send()
            .await
            .map_err(|e| ChainError::ChainUnavailable(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::ChainUnavailable(e.to_string()))?;
        if !receipt.status() {
            return Err(ChainError::TxReverted("refundAndSlash reverted".to_string()));
        }
        self.await_confirmations(receipt.block_number.unwrap_or_default(), receipt.transaction_hash)
            .await
    }

    async fn is_worker_active(&self, addr: Address) -> Result<bool, ChainError> {
        let registry = self.registry();
        retry_rpc(|| async {
            registry
                .isWorkerActive(addr)
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| e.to_string())
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.event_tx.subscribe()
    }
}

/// Bounds how long `await_confirmations` polls before giving up. Past
/// this many polls the chain is not going to confirm any faster by
/// waiting longer, so the wait itself surfaces as `InsufficientConfirmations`
/// rather than blocking the caller forever.
const MAX_CONFIRMATION_POLLS: u32 = 60;

impl<P: Provider<Ethereum> + Clone + Send + Sync + 'static> AlloyChainGateway<P> {
    async fn await_confirmations(
        &self,
        deposited_at_block: u64,
        tx_hash: B256,
    ) -> Result<Receipt, ChainError> {
        let mut confirmations = 0u64;
        for _ in 0..MAX_CONFIRMATION_POLLS {
            let head = self
                .provider
                .get_block_number()
                .await
                .map_err(|e| ChainError::ChainUnavailable(e.to_string()))?;
            confirmations = head.saturating_sub(deposited_at_block) + 1;
            if confirmations >= self.block_confirmations {
                return Ok(Receipt {
                    tx_hash,
                    block_number: deposited_at_block,
                    confirmations,
                });
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        Err(ChainError::InsufficientConfirmations {
            wanted: self.block_confirmations,
            got: confirmations,
        })
    }
}

/// Builds an `AlloyChainGateway` over an HTTP JSON-RPC endpoint, with the
/// master's private key attached as the sending wallet.
pub async fn connect_http(
    rpc_url: &str,
    master_private_key: &str,
    escrow_address: Address,
    registry_address: Address,
    block_confirmations: u64,
) -> anyhow::Result<AlloyChainGateway<impl Provider<Ethereum> + Clone + Send + Sync + 'static>> {
    let signer: PrivateKeySigner = master_private_key.parse()?;
    let wallet = EthereumWallet::from(signer);
    let provider = ProviderBuilder::new()
        .wallet(wallet)
        .on_http(rpc_url.parse()?);

    Ok(AlloyChainGateway::new(
        provider,
        escrow_address,
        registry_address,
        block_confirmations,
    ))
}
