use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use econos_types::{Address, Offer};
use econos_wire::WorkerManifest;
use tokio::sync::RwLock;

use crate::summary::CapabilitySummary;

/// An administratively known worker this index polls. Reputation is
/// carried here rather than read from the manifest: the manifest is the
/// worker's own self-report of price and capability, while reputation is
/// a registry-side judgment the capability index does not own.
#[derive(Debug, Clone)]
pub struct WorkerEndpoint {
    pub address: Address,
    pub manifest_url: String,
    pub reputation: u32,
}

/// Polls each known worker's `GET /manifest` on a fixed interval and
/// caches the aggregated result, modeled on `ProviderRegistry`'s
/// `Arc<RwLock<Vec<...>>>` + `reload` cycle.
pub struct CapabilityIndex {
    known_workers: Vec<WorkerEndpoint>,
    http: reqwest::Client,
    cache: Arc<RwLock<CapabilitySummary>>,
    poll_interval: Duration,
}

impl CapabilityIndex {
    pub fn new(known_workers: Vec<WorkerEndpoint>, poll_interval: Duration) -> Self {
        Self {
            known_workers,
            http: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(CapabilitySummary::default())),
            poll_interval,
        }
    }

    /// Spawns the polling loop. Returns immediately; call `reload` once
    /// beforehand if callers need a populated cache before the first tick.
    pub fn start(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                this.reload().await;
                tokio::time::sleep(this.poll_interval).await;
            }
        });
    }

    /// Fetches every known worker's manifest and rebuilds the cache.
    /// A worker that fails to respond is dropped from the cache
    /// transparently rather than surfacing an error to the caller.
    pub async fn reload(&self) {
        let mut by_task_type: std::collections::HashMap<String, Vec<Offer>> =
            std::collections::HashMap::new();

        for worker in &self.known_workers {
            match self.fetch_manifest(worker).await {
                Ok(manifest) => {
                    for service in manifest.services {
                        let mut capabilities = BTreeSet::new();
                        capabilities.insert(service.id.clone());
                        by_task_type.entry(service.id).or_default().push(Offer {
                            address: worker.address,
                            endpoint: service.endpoint,
                            reputation: worker.reputation,
                            capabilities,
                            pricing_wei_per_task: service.price_wei,
                            is_active: true,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        worker = %worker.address,
                        error = %err,
                        "manifest fetch failed, dropping worker from cache"
                    );
                }
            }
        }

        *self.cache.write().await = CapabilitySummary {
            offers_by_task_type: by_task_type,
        };
    }

    async fn fetch_manifest(&self, worker: &WorkerEndpoint) -> Result<WorkerManifest, reqwest::Error> {
        self.http
            .get(&worker.manifest_url)
            .send()
            .await?
            .json::<WorkerManifest>()
            .await
    }

    pub async fn discover(&self) -> CapabilitySummary {
        self.cache.read().await.clone()
    }

    pub async fn find_cheapest(&self, task_type: &str) -> Option<Offer> {
        self.cache.read().await.cheapest(task_type).cloned()
    }

    pub async fn is_service_available(&self, task_type: &str) -> bool {
        self.cache.read().await.is_available(task_type)
    }
}
