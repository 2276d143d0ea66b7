use anyhow::Result;
use clap::Parser;
use sequencer::api::{create_app, AppState};
use sequencer::config::{ServiceConfig, StageTimeouts};
use sequencer::events::{self, EventReceiver, HandEvent};
use sequencer::proofs::{build_oracle, ProofBackend};
use sequencer::service::{spawn_sweeper, HandService};
use std::{net::SocketAddr, sync::Arc};
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sequencer")]
#[command(about = "ZK Hold'em hand sequencer")]
pub struct Args {
    #[arg(short, long, default_value = "3000", env = "SEQUENCER_PORT")]
    pub port: u16,

    /// Deadline for every stage, in seconds
    #[arg(long, default_value = "30", env = "SEQUENCER_ACTION_TIMEOUT")]
    pub action_timeout: u64,

    /// Overrides the showdown deadline, in seconds
    #[arg(long, env = "SEQUENCER_SHOWDOWN_TIMEOUT")]
    pub showdown_timeout: Option<u64>,

    #[arg(long, default_value = "10", env = "SEQUENCER_PROOF_TIMEOUT")]
    pub proof_timeout: u64,

    #[arg(long, default_value = "1000", env = "SEQUENCER_SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: u64,

    /// Proof verifier. `insecure-disclosure` exposes hole cards to the sequencer
    #[arg(long, value_enum, default_value_t = ProofBackend::Groth16, env = "SEQUENCER_PROOF_BACKEND")]
    pub proof_backend: ProofBackend,

    /// Finished hands kept in memory
    #[arg(long, default_value = "10000", env = "SEQUENCER_ARCHIVE_CAPACITY")]
    pub archive_capacity: usize,
}

impl Args {
    fn service_config(&self) -> ServiceConfig {
        let mut timeouts = StageTimeouts::uniform(Duration::from_secs(self.action_timeout));
        if let Some(secs) = self.showdown_timeout {
            timeouts.showdown = Duration::from_secs(secs);
        }
        ServiceConfig {
            timeouts,
            proof_timeout: Duration::from_secs(self.proof_timeout),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            archive_capacity: self.archive_capacity,
        }
    }
}

/// Stand-in for the escrow collaborator: log every event.
async fn consume_events(mut receiver: EventReceiver) {
    while let Some(event) = receiver.recv().await {
        match &event {
            HandEvent::HandAborted { hand_id, reason } => {
                warn!(%hand_id, ?reason, "Hand aborted")
            }
            HandEvent::PotAwarded {
                hand_id,
                seat,
                split_ways,
            } => info!(%hand_id, %seat, split_ways, "Pot awarded"),
            other => info!(hand_id = %other.hand_id(), event = ?other, "Hand event"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.service_config();
    config.validate()?;

    info!("Starting ZK Hold'em sequencer");
    info!(
        action_timeout = args.action_timeout,
        proof_backend = ?args.proof_backend,
        archive_capacity = args.archive_capacity,
        "Configuration loaded"
    );

    let backend = args.proof_backend;
    let oracle = tokio::task::spawn_blocking(move || build_oracle(backend)).await??;

    let (event_sender, event_receiver) = events::channel();
    let _event_consumer = tokio::spawn(consume_events(event_receiver));

    let service = Arc::new(HandService::new(config, oracle, event_sender));
    let _sweeper = spawn_sweeper(Arc::clone(&service));

    let app = create_app(AppState { service });

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    info!("Sequencer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
