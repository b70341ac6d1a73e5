//! The settlement keeper
//!
//! Each tick reads the current and previous rounds from the chain, evaluates
//! their phases, and submits at most one finalize and at most one rollover.
//! Every submission is awaited to confirmation or failure before the tick
//! returns.

use std::{
    collections::HashSet,
    fmt::{self, Display},
    sync::Arc,
};

use alloy::primitives::TxHash;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    chain_client::{error::ChainClientError, PrizeContract},
    keeper::secrets::SecretProvider,
    rounds::{evaluate, Round, RoundEvaluation, NO_ROUND_ID},
    telemetry::{ACTION_LABEL, SETTLEMENTS_CONFIRMED_METRIC, SETTLEMENTS_FAILED_METRIC},
};

pub mod error;
pub mod secrets;
pub mod worker;

// ---------
// | Types |
// ---------

/// A settlement action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Finalize a round with its secret
    Finalize,
    /// Roll over a round whose claim window expired
    Rollover,
}

impl ActionKind {
    /// The action's name
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Finalize => "finalize",
            ActionKind::Rollover => "rollover",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one settlement path in a tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action's trigger condition does not hold
    NotDue,
    /// The action was already confirmed for this round
    AlreadyConfirmed,
    /// The round's secret is not available yet
    SkippedNoSecret,
    /// The action's transaction was confirmed
    Confirmed(TxHash),
    /// The action failed and will be retried on the next tick
    Failed(String),
}

/// The outcome of a keeper tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickReport {
    /// No round has started yet
    NoRound,
    /// The round state could not be read
    ReadFailed(String),
    /// The rounds were evaluated and the due actions attempted
    Evaluated {
        /// The round evaluation
        evaluation: RoundEvaluation,
        /// The finalize path's outcome
        finalize: ActionOutcome,
        /// The rollover path's outcome
        rollover: ActionOutcome,
    },
}

// ----------
// | Keeper |
// ----------

/// Settles prize rounds on-chain
pub struct SettlementKeeper {
    /// The prize round contract
    contract: Arc<dyn PrizeContract>,
    /// The round secret store
    secrets: Arc<dyn SecretProvider>,
    /// The actions confirmed during this process's lifetime
    confirmed: HashSet<(ActionKind, u64)>,
}

impl SettlementKeeper {
    /// Create a new keeper
    pub fn new(contract: Arc<dyn PrizeContract>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { contract, secrets, confirmed: HashSet::new() }
    }

    /// Evaluate the rounds at the given unix time and settle what is due
    #[instrument(skip(self))]
    pub async fn tick(&mut self, now: u64) -> TickReport {
        let (current, previous) = match self.read_rounds().await {
            Ok(Some(rounds)) => rounds,
            Ok(None) => {
                debug!("no round yet");
                return TickReport::NoRound;
            },
            Err(e) => {
                warn!("failed to read round state: {e}");
                return TickReport::ReadFailed(e.to_string());
            },
        };

        // Only the current and previous rounds can still be acted on
        self.confirmed.retain(|(_, round_id)| round_id.saturating_add(1) >= current.id);

        let evaluation = evaluate(&current, previous.as_ref(), now);
        let actions = evaluation.planned_actions();

        let finalize = match actions.finalize {
            Some(round_id) => self.finalize(round_id).await,
            None => ActionOutcome::NotDue,
        };
        let rollover = match actions.rollover {
            Some(round_id) => self.rollover(round_id).await,
            None => ActionOutcome::NotDue,
        };

        TickReport::Evaluated { evaluation, finalize, rollover }
    }

    // -----------
    // | Helpers |
    // -----------

    /// Read the current round and, if one exists, the previous round
    ///
    /// A failure reading the previous round only disables its rollover
    async fn read_rounds(&self) -> Result<Option<(Round, Option<Round>)>, ChainClientError> {
        let round_id = self.contract.current_round_id().await?;
        if round_id == NO_ROUND_ID {
            return Ok(None);
        }

        let claim_window = self.contract.claim_window_secs().await?;
        let record = self.contract.round(round_id).await?;
        let current = Round::from_record(round_id, record, claim_window);

        let previous_id = round_id - 1;
        if previous_id == NO_ROUND_ID {
            return Ok(Some((current, None)));
        }

        let previous = match self.contract.round(previous_id).await {
            Ok(record) => Some(Round::from_record(previous_id, record, claim_window)),
            Err(e) => {
                warn!(round_id = previous_id, "failed to read previous round: {e}");
                None
            },
        };

        Ok(Some((current, previous)))
    }

    /// Finalize a round with its secret
    async fn finalize(&mut self, round_id: u64) -> ActionOutcome {
        let kind = ActionKind::Finalize;
        if self.confirmed.contains(&(kind, round_id)) {
            debug!(round_id, action = %kind, "already confirmed");
            return ActionOutcome::AlreadyConfirmed;
        }

        let secret = match self.secrets.get_secret(round_id).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                debug!(round_id, action = %kind, "secret not available, skipping");
                return ActionOutcome::SkippedNoSecret;
            },
            Err(e) => {
                warn!(round_id, action = %kind, "failed to fetch secret: {e}");
                return ActionOutcome::Failed(e.to_string());
            },
        };

        debug!(round_id = secret.round_id(), action = %kind, "secret available");
        let result = self.contract.finalize(round_id, secret.into_bytes()).await;
        let outcome = self.record(kind, round_id, result);
        if matches!(outcome, ActionOutcome::Confirmed(_)) {
            if let Err(e) = self.secrets.erase(round_id).await {
                warn!(round_id, "failed to erase consumed secret: {e}");
            }
        }

        outcome
    }

    /// Roll over a round whose claim window expired
    async fn rollover(&mut self, round_id: u64) -> ActionOutcome {
        let kind = ActionKind::Rollover;
        if self.confirmed.contains(&(kind, round_id)) {
            debug!(round_id, action = %kind, "already confirmed");
            return ActionOutcome::AlreadyConfirmed;
        }

        let result = self.contract.rollover(round_id).await;
        self.record(kind, round_id, result)
    }

    /// Log and record the result of a settlement submission
    fn record(
        &mut self,
        kind: ActionKind,
        round_id: u64,
        result: Result<TxHash, ChainClientError>,
    ) -> ActionOutcome {
        match result {
            Ok(tx_hash) => {
                info!(round_id, action = %kind, tx = %tx_hash, "settlement confirmed");
                metrics::counter!(SETTLEMENTS_CONFIRMED_METRIC, ACTION_LABEL => kind.as_str())
                    .increment(1);
                self.confirmed.insert((kind, round_id));
                ActionOutcome::Confirmed(tx_hash)
            },
            Err(e) => {
                error!(round_id, action = %kind, "settlement failed: {e}");
                metrics::counter!(SETTLEMENTS_FAILED_METRIC, ACTION_LABEL => kind.as_str())
                    .increment(1);
                ActionOutcome::Failed(e.to_string())
            },
        }
    }
}
