//! The chain keeper watches pair activity on-chain, persists periodic pair
//! metrics, and settles prize rounds once they are due

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use chain_keeper::{
    chain_client::{ChainClient, ConfirmationConfig},
    cli::Cli,
    db::{client::DbClient, store::MetricsStore},
    error::KeeperError,
    flusher::MetricsFlusher,
    keeper::{secrets::AwsSecretProvider, worker::KeeperWorker, SettlementKeeper},
    pairs::{PairSource, StaticPairSource},
    scanner::{
        cursor::ScanCursor,
        worker::{WatcherConfig, WatcherWorker},
        BlockRangeScanner,
    },
    telemetry::setup_logging,
};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), KeeperError> {
    let cli = Cli::parse();
    setup_logging(cli.datadog_logging);

    // Configuration faults are fatal before any loop starts
    cli.validate()?;
    let signer = cli.signer()?;
    info!(signer = %signer.address(), "starting chain keeper");

    // Set up the chain client
    let confirmation = ConfirmationConfig {
        required_confirmations: cli.required_confirmations,
        timeout: cli.confirmation_timeout(),
    };
    let chain_client =
        Arc::new(ChainClient::new(&cli.rpc_url, cli.prize_address, signer, confirmation).await?);
    info!(prize = %chain_client.prize_address(), "connected to prize contract");

    // Set up the database client
    let db_client = Arc::new(DbClient::new(&cli.database_url).await?);

    // Set up the secret store
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(cli.secrets_region.clone()))
        .load()
        .await;
    let secrets = Arc::new(AwsSecretProvider::new(&aws_config, cli.round_secret_prefix.clone()));

    // Resolve the monitored pair source and the starting cursor
    let pairs: Arc<dyn PairSource> = if cli.pair_addresses.is_empty() {
        info!("reading monitored pairs from the database");
        db_client.clone()
    } else {
        info!(count = cli.pair_addresses.len(), "monitoring static pair set");
        Arc::new(StaticPairSource::new(cli.pair_addresses.iter().copied()))
    };
    let last_block_scanned = db_client.load_cursor().await?.unwrap_or(cli.start_block);
    info!(last_block_scanned, "resuming scan");

    // Build the workers
    let cancel = CancellationToken::new();
    let scanner = BlockRangeScanner::new(
        cli.scanner_config(),
        ScanCursor::new(last_block_scanned),
        chain_client.clone(),
        pairs,
    );
    let watcher_config = WatcherConfig {
        ws_url: cli.ws_rpc_url.clone(),
        head_poll_interval: cli.head_poll_interval(),
        flush_interval: cli.flush_interval(),
    };
    let watcher = WatcherWorker::new(
        watcher_config,
        scanner,
        MetricsFlusher::new(db_client),
        chain_client.clone(),
        cancel.clone(),
    );

    let keeper = SettlementKeeper::new(chain_client, secrets);
    let keeper = KeeperWorker::new(keeper, cli.keeper_interval(), cancel.clone());

    let mut workers = JoinSet::new();
    workers.spawn(watcher.run());
    workers.spawn(keeper.run());

    // Run until interrupted or until a worker exits
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.map_err(KeeperError::task)?;
            info!("received shutdown signal");
        },
        Some(res) = workers.join_next() => {
            if let Err(e) = res {
                error!("worker failed: {e}");
            }
        },
    }

    cancel.cancel();
    while let Some(res) = workers.join_next().await {
        res.map_err(KeeperError::task)?;
    }

    info!("chain keeper stopped");
    Ok(())
}
