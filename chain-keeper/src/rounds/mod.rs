//! Round lifecycle classification
//!
//! Evaluation is pure: it takes the on-chain round records and the current
//! time, and never performs a transition itself

use crate::chain_client::RoundRecord;

/// The id of the sentinel "no round yet" value
pub const NO_ROUND_ID: u64 = 0;

// ---------
// | Types |
// ---------

/// A prize round, as read from the chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Round {
    /// The round id
    pub id: u64,
    /// The timestamp after which the round may be finalized
    pub end_ts: u64,
    /// Whether the round has been finalized
    pub finalized: bool,
    /// The length of the claim window following the deadline, in seconds
    pub claim_window_secs: u64,
}

impl Round {
    /// Build a round from its on-chain record
    pub fn from_record(id: u64, record: RoundRecord, claim_window_secs: u64) -> Self {
        Self { id, end_ts: record.end_ts, finalized: record.finalized, claim_window_secs }
    }

    /// The timestamp after which an unfinalized round may be rolled over
    pub fn claim_deadline(&self) -> u64 {
        self.end_ts.saturating_add(self.claim_window_secs)
    }

    /// The lifecycle phase of the round at the given time
    pub fn phase(&self, now: u64) -> RoundPhase {
        if self.finalized {
            RoundPhase::Finalized
        } else if now > self.end_ts {
            RoundPhase::PastDeadlineUnfinalized
        } else {
            RoundPhase::Active
        }
    }

    /// The claim window phase of the round at the given time
    pub fn claim_window_phase(&self, now: u64) -> ClaimWindowPhase {
        if self.finalized {
            ClaimWindowPhase::Settled
        } else if now <= self.end_ts {
            ClaimWindowPhase::Pending
        } else if now <= self.claim_deadline() {
            ClaimWindowPhase::Open
        } else {
            ClaimWindowPhase::RolloverEligible
        }
    }
}

/// The lifecycle phase of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// The deadline has not yet passed
    Active,
    /// The deadline has passed and the round awaits finalization
    PastDeadlineUnfinalized,
    /// The round has been finalized
    Finalized,
}

/// The claim window phase of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimWindowPhase {
    /// The round has been finalized, no rollover applies
    Settled,
    /// The deadline has not yet passed
    Pending,
    /// The deadline has passed and the claim window is still open
    Open,
    /// The claim window expired without finalization
    RolloverEligible,
}

/// The result of evaluating the current and previous rounds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundEvaluation {
    /// No round has started yet
    NoRound,
    /// The current round, and the previous round if one exists
    Evaluated {
        /// The current round id
        round_id: u64,
        /// The current round's lifecycle phase
        phase: RoundPhase,
        /// The current round's claim window phase
        claim_window: ClaimWindowPhase,
        /// The previous round's id and claim window phase
        previous: Option<(u64, ClaimWindowPhase)>,
    },
}

/// The settlement actions implied by an evaluation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlannedActions {
    /// The round to finalize, if any
    pub finalize: Option<u64>,
    /// The round to roll over, if any
    pub rollover: Option<u64>,
}

// --------------
// | Evaluation |
// --------------

/// Classify the current round and the previous round at the given time
///
/// A previous round with the sentinel id is excluded from evaluation
pub fn evaluate(round: &Round, previous: Option<&Round>, now: u64) -> RoundEvaluation {
    if round.id == NO_ROUND_ID {
        return RoundEvaluation::NoRound;
    }

    let previous = previous
        .filter(|prev| prev.id != NO_ROUND_ID)
        .map(|prev| (prev.id, prev.claim_window_phase(now)));

    RoundEvaluation::Evaluated {
        round_id: round.id,
        phase: round.phase(now),
        claim_window: round.claim_window_phase(now),
        previous,
    }
}

impl RoundEvaluation {
    /// The actions to attempt this tick
    ///
    /// The current round is finalized once its deadline has passed. Only the
    /// previous round is ever rolled over.
    pub fn planned_actions(&self) -> PlannedActions {
        let RoundEvaluation::Evaluated { round_id, phase, previous, .. } = *self else {
            return PlannedActions::default();
        };

        let finalize = match phase {
            RoundPhase::PastDeadlineUnfinalized => Some(round_id),
            RoundPhase::Active | RoundPhase::Finalized => None,
        };

        let rollover = match previous {
            Some((prev_id, ClaimWindowPhase::RolloverEligible)) => Some(prev_id),
            _ => None,
        };

        PlannedActions { finalize, rollover }
    }
}
