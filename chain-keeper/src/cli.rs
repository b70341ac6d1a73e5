//! Command-line interface for the chain keeper

use std::{str::FromStr, time::Duration};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use clap::{Parser, ValueEnum};

use crate::{
    error::KeeperError,
    scanner::{cursor::CursorPolicy, ScannerConfig},
};

/// The chain keeper CLI
#[rustfmt::skip]
#[derive(Parser, Clone)]
#[clap(about = "Pair metrics watcher and prize round settlement keeper")]
pub struct Cli {
    // ------------
    // | Database |
    // ------------

    /// The database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: String,

    // --------------
    // | Blockchain |
    // --------------

    /// The JSON-RPC URL to use for blockchain interaction
    #[clap(long, env = "RPC_URL")]
    pub rpc_url: String,
    /// The Websocket RPC URL to use for new head notifications
    ///
    /// If omitted, the watcher relies on polling alone
    #[clap(long, env = "WS_RPC_URL")]
    pub ws_rpc_url: Option<String>,
    /// The address of the prize round contract
    #[clap(long, env = "PRIZE_ADDRESS")]
    pub prize_address: Address,
    /// The pair addresses to monitor
    ///
    /// If empty, the monitored set is read from the `monitored_pairs` table
    #[clap(long, env = "PAIR_ADDRESSES", value_delimiter = ',')]
    pub pair_addresses: Vec<Address>,
    /// The private key of the settlement signer
    #[clap(long, env = "OWNER_PK", hide_env_values = true)]
    pub owner_pk: String,

    // -----------
    // | Scanner |
    // -----------

    /// The block to start scanning from when no cursor has been persisted
    #[clap(long, env = "START_BLOCK", default_value = "0")]
    pub start_block: u64,
    /// When the scan cursor advances relative to the log fetch
    #[clap(long, env = "CURSOR_POLICY", value_enum, default_value = "advance-before-fetch")]
    pub cursor_policy: CursorPolicyArg,
    /// The number of blocks behind the head to hold back from scanning
    #[clap(long, env = "CONFIRMATION_DEPTH", default_value = "0")]
    pub confirmation_depth: u64,
    /// The maximum number of blocks to request in a single log query
    #[clap(long, env = "MAX_BLOCK_RANGE", default_value = "2000")]
    pub max_block_range: u64,
    /// The pair swap fee, in basis points of the input amount
    #[clap(long, env = "SWAP_FEE_BPS", default_value = "30")]
    pub swap_fee_bps: u64,
    /// The interval at which the head block is polled, in milliseconds
    #[clap(long, env = "HEAD_POLL_INTERVAL_MS", default_value = "12000")]
    pub head_poll_interval_ms: u64,

    // -----------
    // | Flusher |
    // -----------

    /// The interval at which buffered metrics are persisted, in milliseconds
    #[clap(long, env = "FLUSH_INTERVAL_MS", default_value = "30000")]
    pub flush_interval_ms: u64,

    // ----------
    // | Keeper |
    // ----------

    /// The interval at which the round state is evaluated, in milliseconds
    #[clap(long, env = "KEEPER_INTERVAL_MS", default_value = "15000")]
    pub keeper_interval_ms: u64,
    /// The number of confirmations to wait for on settlement transactions
    #[clap(long, env = "REQUIRED_CONFIRMATIONS", default_value = "1")]
    pub required_confirmations: u64,
    /// The maximum time to wait for a settlement receipt, in seconds
    #[clap(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value = "120")]
    pub confirmation_timeout_secs: u64,

    // -----------
    // | Secrets |
    // -----------

    /// The AWS region in which round secrets are stored
    #[clap(long, env = "SECRETS_REGION", default_value = "us-east-2")]
    pub secrets_region: String,
    /// The prefix of the round secret names
    #[clap(long, env = "ROUND_SECRET_PREFIX", default_value = "prize")]
    pub round_secret_prefix: String,

    // -------------
    // | Telemetry |
    // -------------

    /// Whether to enable datadog formatted logs
    #[clap(long, env = "DATADOG_LOGGING")]
    pub datadog_logging: bool,
}

/// The CLI representation of a cursor policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CursorPolicyArg {
    /// Advance the cursor before fetching logs
    AdvanceBeforeFetch,
    /// Advance the cursor only after every fetch in the range succeeded
    AdvanceAfterFetch,
}

impl From<CursorPolicyArg> for CursorPolicy {
    fn from(arg: CursorPolicyArg) -> Self {
        match arg {
            CursorPolicyArg::AdvanceBeforeFetch => CursorPolicy::AdvanceBeforeFetch,
            CursorPolicyArg::AdvanceAfterFetch => CursorPolicy::AdvanceAfterFetch,
        }
    }
}

impl Cli {
    /// Parse the settlement signer
    ///
    /// A missing or malformed key is a configuration fault; the keeper must
    /// not start without one
    pub fn signer(&self) -> Result<PrivateKeySigner, KeeperError> {
        parse_signer(&self.owner_pk)
    }

    /// Validate the CLI arguments
    pub fn validate(&self) -> Result<(), KeeperError> {
        if self.max_block_range == 0 {
            return Err(KeeperError::config("--max-block-range must be positive"));
        }

        if self.swap_fee_bps >= 10_000 {
            return Err(KeeperError::config("--swap-fee-bps must be below 10000"));
        }

        if self.head_poll_interval_ms == 0
            || self.flush_interval_ms == 0
            || self.keeper_interval_ms == 0
        {
            return Err(KeeperError::config("intervals must be positive"));
        }

        Ok(())
    }

    /// Build the scanner configuration
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            policy: self.cursor_policy.into(),
            confirmation_depth: self.confirmation_depth,
            max_block_range: self.max_block_range,
            swap_fee_bps: self.swap_fee_bps,
        }
    }

    /// The head poll interval
    pub fn head_poll_interval(&self) -> Duration {
        Duration::from_millis(self.head_poll_interval_ms)
    }

    /// The flush interval
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// The keeper tick interval
    pub fn keeper_interval(&self) -> Duration {
        Duration::from_millis(self.keeper_interval_ms)
    }

    /// The settlement confirmation timeout
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

// -----------
// | Helpers |
// -----------

/// Parse a raw private key into a signer
///
/// Surrounding quotes and whitespace are stripped and a `0x` prefix is
/// added when missing
pub fn parse_signer(raw: &str) -> Result<PrivateKeySigner, KeeperError> {
    let key = normalize_private_key(raw);
    if key.len() <= 2 {
        return Err(KeeperError::config("settlement signer key is missing"));
    }

    PrivateKeySigner::from_str(&key)
        .map_err(|e| KeeperError::config(format!("invalid settlement signer key: {e}")))
}

/// Normalize a raw private key string
fn normalize_private_key(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        format!("0x{}", &trimmed[2..])
    } else {
        format!("0x{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A well-known development private key
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    /// The address of `DEV_KEY`
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    /// Tests that quoted and unprefixed keys normalize to the same signer
    #[test]
    fn test_parse_signer_normalizes() {
        let expected = Address::from_str(DEV_ADDRESS).unwrap();
        for raw in [
            DEV_KEY.to_string(),
            format!("0x{DEV_KEY}"),
            format!("\"{DEV_KEY}\""),
            format!("  '0x{DEV_KEY}'\n"),
        ] {
            let signer = parse_signer(&raw).unwrap();
            assert_eq!(signer.address(), expected);
        }
    }

    /// Tests that a missing key is a configuration fault
    #[test]
    fn test_parse_signer_missing() {
        for raw in ["", "   ", "\"\"", "0x"] {
            assert!(matches!(parse_signer(raw), Err(KeeperError::Config(_))));
        }
    }

    /// Tests that a malformed key is a configuration fault
    #[test]
    fn test_parse_signer_malformed() {
        assert!(matches!(parse_signer("0xnothex"), Err(KeeperError::Config(_))));
    }

    /// Tests argument parsing with defaults and a comma-separated pair list
    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "chain-keeper",
            "--database-url",
            "postgres://localhost/keeper",
            "--rpc-url",
            "http://localhost:8545",
            "--prize-address",
            "0x0000000000000000000000000000000000000001",
            "--pair-addresses",
            "0x0000000000000000000000000000000000000002,0x0000000000000000000000000000000000000003",
            "--owner-pk",
            DEV_KEY,
            "--cursor-policy",
            "advance-after-fetch",
        ])
        .unwrap();

        assert_eq!(cli.pair_addresses.len(), 2);
        assert!(cli.validate().is_ok());
        assert!(cli.signer().is_ok());

        let config = cli.scanner_config();
        assert_eq!(config.policy, CursorPolicy::AdvanceAfterFetch);
        assert_eq!(config.max_block_range, 2000);
        assert_eq!(config.swap_fee_bps, 30);
    }
}
