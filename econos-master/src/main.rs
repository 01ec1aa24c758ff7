use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use econos_auth::AuthorizationSigner;
use econos_capability::{CapabilityIndex, WorkerEndpoint};
use econos_chain::{connect_http, Address, ChainGateway, FakeChainGateway};
use econos_core::TaskManager;
use econos_directory::WorkerDirectory;
use econos_monitor::LifecycleMonitor;
use econos_orchestrator::{AppState, Orchestrator};
use econos_planner::{PlanAnalyzer, StubAnalyzer};
use econos_store::InMemoryTaskStore;
use econos_types::TaskType;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "econos-master")]
#[command(about = "Master orchestrator: hires workers, escrows payment, drives tasks to completion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the /hire, /chat and /healthz HTTP surface.
    Serve {
        #[arg(long, alias = "host", default_value = "127.0.0.1")]
        hostname: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

/// Process-wide configuration, loaded once at startup from the
/// environment and passed by construction to every component rather than
/// re-read ad hoc.
struct MasterConfig {
    rpc_url: String,
    master_private_key: String,
    escrow_address: Address,
    registry_address: Address,
    chain_id: u64,
    block_confirmations: u64,
    chain_start_block: u64,
    min_reputation: u32,
    expiration_check_interval: Duration,
    known_workers: Vec<WorkerEndpoint>,
    capability_poll_interval: Duration,
    authorization_default_validity_secs: u64,
    nonce_retention: Duration,
    logs_dir: PathBuf,
    log_retention_days: u64,
    use_fake_chain: bool,
}

impl MasterConfig {
    fn from_env() -> anyhow::Result<Self> {
        let use_fake_chain = env_flag("ECONOS_FAKE_CHAIN", false);

        let master_private_key = std::env::var("ECONOS_MASTER_PRIVATE_KEY").unwrap_or_else(|_| {
            "0x0000000000000000000000000000000000000000000000000000000000000001".to_string()
        });

        Ok(Self {
            rpc_url: std::env::var("ECONOS_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            master_private_key,
            escrow_address: parse_address_env("ECONOS_ESCROW_ADDRESS")?,
            registry_address: parse_address_env("ECONOS_REGISTRY_ADDRESS")?,
            chain_id: env_u64("ECONOS_CHAIN_ID", 31337),
            block_confirmations: env_u64("ECONOS_BLOCK_CONFIRMATIONS", 2),
            chain_start_block: env_u64("ECONOS_CHAIN_START_BLOCK", 0),
            min_reputation: env_u64("ECONOS_MIN_REPUTATION", 50) as u32,
            expiration_check_interval: Duration::from_secs(env_u64(
                "ECONOS_EXPIRATION_CHECK_INTERVAL_SECS",
                60,
            )),
            known_workers: parse_known_workers(&std::env::var("ECONOS_KNOWN_WORKERS").unwrap_or_default()),
            capability_poll_interval: Duration::from_secs(env_u64("ECONOS_CAPABILITY_POLL_SECS", 30)),
            authorization_default_validity_secs: env_u64(
                "ECONOS_AUTHORIZATION_DEFAULT_VALIDITY_SECS",
                3600,
            ),
            nonce_retention: Duration::from_secs(env_u64("ECONOS_NONCE_RETENTION_SECS", 86_400)),
            logs_dir: std::env::var("ECONOS_LOGS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".econos/logs")),
            log_retention_days: env_u64("ECONOS_LOG_RETENTION_DAYS", 14),
            use_fake_chain,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_address_env(name: &str) -> anyhow::Result<Address> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .parse()
            .with_context(|| format!("{name} is not a valid address")),
        _ => Ok(Address::ZERO),
    }
}

/// Parses `ECONOS_KNOWN_WORKERS` as `address@manifest_url@reputation`
/// entries separated by `;`, e.g.
/// `0xabc...@http://worker-a:8080/manifest@80;0xdef...@http://worker-b:8080/manifest@60`.
fn parse_known_workers(raw: &str) -> Vec<WorkerEndpoint> {
    raw.split(';')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, '@');
            let address = parts.next()?.parse().ok()?;
            let manifest_url = parts.next()?.to_string();
            let reputation = parts.next().and_then(|r| r.parse().ok()).unwrap_or(0);
            Some(WorkerEndpoint {
                address,
                manifest_url,
                reputation,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MasterConfig::from_env()?;
    let (_guard, log_info) =
        econos_observability::init_logging(&config.logs_dir, config.log_retention_days)?;
    info!(logs_dir = %log_info.logs_dir, "logging initialized");

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { hostname, port } => {
            let addr: SocketAddr = format!("{hostname}:{port}")
                .parse()
                .context("invalid hostname or port")?;
            let state = build_state(&config).await?;
            info!(%addr, "starting econos-master");
            econos_orchestrator::serve(addr, state).await?;
        }
    }

    Ok(())
}

async fn build_state(config: &MasterConfig) -> anyhow::Result<AppState> {
    let chain: Arc<dyn ChainGateway> = if config.use_fake_chain {
        Arc::new(FakeChainGateway::new())
    } else {
        let gateway = connect_http(
            &config.rpc_url,
            &config.master_private_key,
            config.escrow_address,
            config.registry_address,
            config.block_confirmations,
        )
        .await
        .context("failed to connect chain gateway")?;
        let gateway = Arc::new(gateway);
        gateway.spawn_event_loop(config.chain_start_block);
        gateway
    };

    let store = Arc::new(InMemoryTaskStore::new());
    let tasks = Arc::new(TaskManager::new(store));

    let directory = Arc::new(WorkerDirectory::with_min_reputation(
        Arc::clone(&chain),
        config.min_reputation,
    ));

    let capability_index = Arc::new(CapabilityIndex::new(
        config.known_workers.clone(),
        config.capability_poll_interval,
    ));
    capability_index.reload().await;
    capability_index.start();

    let signer: alloy::signers::local::PrivateKeySigner = config
        .master_private_key
        .parse()
        .context("ECONOS_MASTER_PRIVATE_KEY is not a valid private key")?;
    let auth_signer = Arc::new(AuthorizationSigner::new(
        signer,
        config.chain_id,
        config.escrow_address,
    ));
    auth_signer.spawn_nonce_pruner(config.nonce_retention);

    let monitor = Arc::new(LifecycleMonitor::with_interval(
        Arc::clone(&chain),
        Arc::clone(&tasks),
        config.expiration_check_interval,
    ));
    monitor.start().await;

    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::clone(&tasks),
            Arc::clone(&chain),
            Arc::clone(&directory),
            Arc::clone(&capability_index),
            auth_signer,
        )
        .with_default_validity_secs(config.authorization_default_validity_secs),
    );

    let chat_analyzer: Arc<dyn PlanAnalyzer> = Arc::new(StubAnalyzer::new(TaskType::Writer));

    Ok(AppState::new(orchestrator, capability_index, chat_analyzer))
}
