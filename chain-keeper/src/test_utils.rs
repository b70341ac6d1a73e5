//! In-memory sources and stores for driving the keeper's loops in tests

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use alloy::{
    primitives::{aliases::U112, Address, Bytes, Log as PrimitiveLog, TxHash, B256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    chain_client::{
        abis::IPair::{Swap, Sync},
        error::ChainClientError,
        HeadSource, LogSource, PrizeContract, RoundRecord,
    },
    db::{error::DbError, store::MetricsStore},
    keeper::{
        error::SecretsError,
        secrets::{SecretHandle, SecretProvider},
    },
    pairs::PairSource,
    scanner::{buffer::MetricsSnapshot, cursor::BlockRange},
};

// --------
// | Logs |
// --------

/// Wrap encoded event data in an RPC log mined at the given block
fn mined_log<E: SolEvent>(pair: Address, block: u64, event: &E) -> Log {
    Log {
        inner: PrimitiveLog { address: pair, data: event.encode_log_data() },
        block_number: Some(block),
        transaction_hash: Some(B256::left_padding_from(&block.to_be_bytes())),
        ..Default::default()
    }
}

/// Build a swap log emitted by the given pair
pub fn swap_log(
    pair: Address,
    block: u64,
    amount0_in: u64,
    amount1_in: u64,
    amount0_out: u64,
    amount1_out: u64,
) -> Log {
    let swap = Swap {
        sender: Address::repeat_byte(0x11),
        amount0In: U256::from(amount0_in),
        amount1In: U256::from(amount1_in),
        amount0Out: U256::from(amount0_out),
        amount1Out: U256::from(amount1_out),
        to: Address::repeat_byte(0x22),
    };

    mined_log(pair, block, &swap)
}

/// Build a sync log emitted by the given pair
pub fn sync_log(pair: Address, block: u64, reserve0: u64, reserve1: u64) -> Log {
    let sync = Sync { reserve0: U112::from(reserve0), reserve1: U112::from(reserve1) };
    mined_log(pair, block, &sync)
}

// ---------------
// | Chain Mocks |
// ---------------

/// The state of a mock log source
#[derive(Default)]
struct LogSourceState {
    /// The logs available to queries
    logs: Vec<Log>,
    /// Pairs whose queries fail
    failing_pairs: HashSet<Address>,
    /// Blocks whose covering queries fail
    failing_blocks: HashSet<u64>,
    /// Every query issued, in order
    queries: Vec<(Address, BlockRange)>,
}

/// A log source serving logs from memory
#[derive(Default)]
pub struct MockLogSource {
    /// The source's state
    state: Mutex<LogSourceState>,
}

impl MockLogSource {
    /// Make a log available to queries
    pub fn push_log(&self, log: Log) {
        self.state.lock().unwrap().logs.push(log);
    }

    /// Fail every query for the given pair
    pub fn fail_pair(&self, pair: Address) {
        self.state.lock().unwrap().failing_pairs.insert(pair);
    }

    /// Fail every query whose range covers the given block
    pub fn fail_block(&self, block: u64) {
        self.state.lock().unwrap().failing_blocks.insert(block);
    }

    /// Clear all injected failures
    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_pairs.clear();
        state.failing_blocks.clear();
    }

    /// The queries issued so far, including failed ones
    pub fn queries(&self) -> Vec<(Address, BlockRange)> {
        self.state.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn get_logs(
        &self,
        pair: Address,
        range: BlockRange,
    ) -> Result<Vec<Log>, ChainClientError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push((pair, range));

        let covers_failing_block =
            state.failing_blocks.iter().any(|b| (range.from..=range.to).contains(b));
        if state.failing_pairs.contains(&pair) || covers_failing_block {
            return Err(ChainClientError::rpc("injected log query failure"));
        }

        let logs = state
            .logs
            .iter()
            .filter(|log| log.address() == pair)
            .filter(|log| log.block_number.is_none_or(|b| (range.from..=range.to).contains(&b)))
            .cloned()
            .collect();
        Ok(logs)
    }
}

/// A head source returning a settable block number
pub struct MockHeadSource {
    /// The current head
    head: AtomicU64,
    /// Whether head reads fail
    failing: AtomicBool,
}

impl MockHeadSource {
    /// Create a head source at the given block
    pub fn new(head: u64) -> Self {
        Self { head: AtomicU64::new(head), failing: AtomicBool::new(false) }
    }

    /// Move the head
    pub fn set(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Toggle head read failures
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl HeadSource for MockHeadSource {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainClientError::rpc("injected head failure"));
        }

        Ok(self.head.load(Ordering::SeqCst))
    }
}

/// The state of a mock prize contract
struct PrizeState {
    /// The current round id
    current_round_id: u64,
    /// The round records by id
    rounds: HashMap<u64, RoundRecord>,
    /// The claim window in seconds
    claim_window_secs: u64,
    /// Rounds whose reads fail
    failing_reads: HashSet<u64>,
    /// Whether the next submission fails
    fail_next_submission: bool,
    /// Whether confirmed settlements mark the round finalized
    apply_settlements: bool,
    /// The finalize submissions, with their secrets
    finalize_calls: Vec<(u64, Vec<u8>)>,
    /// The rollover submissions
    rollover_calls: Vec<u64>,
}

/// A prize contract held in memory
pub struct MockPrizeContract {
    /// The contract's state
    state: Mutex<PrizeState>,
    /// The number of transactions submitted
    nonce: AtomicU64,
}

impl MockPrizeContract {
    /// Create a contract with no rounds
    pub fn new(claim_window_secs: u64) -> Self {
        let state = PrizeState {
            current_round_id: 0,
            rounds: HashMap::new(),
            claim_window_secs,
            failing_reads: HashSet::new(),
            fail_next_submission: false,
            apply_settlements: true,
            finalize_calls: Vec::new(),
            rollover_calls: Vec::new(),
        };

        Self { state: Mutex::new(state), nonce: AtomicU64::new(0) }
    }

    /// Set a round's record, advancing the current round id to it if higher
    pub fn set_round(&self, round_id: u64, end_ts: u64, finalized: bool) {
        let mut state = self.state.lock().unwrap();
        state.rounds.insert(round_id, RoundRecord { end_ts, finalized });
        state.current_round_id = state.current_round_id.max(round_id);
    }

    /// Fail reads of the given round
    pub fn fail_round_read(&self, round_id: u64) {
        self.state.lock().unwrap().failing_reads.insert(round_id);
    }

    /// Fail the next finalize or rollover submission
    pub fn fail_next_submission(&self) {
        self.state.lock().unwrap().fail_next_submission = true;
    }

    /// Whether confirmed settlements are reflected in subsequent reads
    pub fn set_apply_settlements(&self, apply: bool) {
        self.state.lock().unwrap().apply_settlements = apply;
    }

    /// The finalize submissions so far
    pub fn finalize_calls(&self) -> Vec<(u64, Vec<u8>)> {
        self.state.lock().unwrap().finalize_calls.clone()
    }

    /// The rollover submissions so far
    pub fn rollover_calls(&self) -> Vec<u64> {
        self.state.lock().unwrap().rollover_calls.clone()
    }

    /// Settle a submission against the state, failing if one was injected
    fn settle(&self, state: &mut PrizeState, round_id: u64) -> Result<TxHash, ChainClientError> {
        if std::mem::take(&mut state.fail_next_submission) {
            return Err(ChainClientError::Reverted(format!("round {round_id}")));
        }

        if state.apply_settlements {
            if let Some(record) = state.rounds.get_mut(&round_id) {
                record.finalized = true;
            }
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(B256::left_padding_from(&nonce.to_be_bytes()))
    }
}

#[async_trait]
impl PrizeContract for MockPrizeContract {
    async fn current_round_id(&self) -> Result<u64, ChainClientError> {
        Ok(self.state.lock().unwrap().current_round_id)
    }

    async fn round(&self, round_id: u64) -> Result<RoundRecord, ChainClientError> {
        let state = self.state.lock().unwrap();
        if state.failing_reads.contains(&round_id) {
            return Err(ChainClientError::contract_call("injected round read failure"));
        }

        let unset = RoundRecord { end_ts: 0, finalized: false };
        Ok(state.rounds.get(&round_id).copied().unwrap_or(unset))
    }

    async fn claim_window_secs(&self) -> Result<u64, ChainClientError> {
        Ok(self.state.lock().unwrap().claim_window_secs)
    }

    async fn finalize(&self, round_id: u64, secret: Bytes) -> Result<TxHash, ChainClientError> {
        let mut state = self.state.lock().unwrap();
        state.finalize_calls.push((round_id, secret.to_vec()));
        self.settle(&mut state, round_id)
    }

    async fn rollover(&self, round_id: u64) -> Result<TxHash, ChainClientError> {
        let mut state = self.state.lock().unwrap();
        state.rollover_calls.push(round_id);
        self.settle(&mut state, round_id)
    }
}

// ---------------
// | Store Mocks |
// ---------------

/// A pair source over a settable set
pub struct MockPairSource {
    /// The monitored pairs
    pairs: Mutex<BTreeSet<Address>>,
    /// Whether loads fail
    failing: AtomicBool,
}

impl MockPairSource {
    /// Create a pair source over the given pairs
    pub fn new(pairs: impl IntoIterator<Item = Address>) -> Self {
        Self { pairs: Mutex::new(pairs.into_iter().collect()), failing: AtomicBool::new(false) }
    }

    /// Toggle load failures
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PairSource for MockPairSource {
    async fn load_monitored_pairs(&self) -> Result<BTreeSet<Address>, DbError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DbError::pool_connection("injected pair set failure"));
        }

        Ok(self.pairs.lock().unwrap().clone())
    }
}

/// A metrics store held in memory
#[derive(Default)]
pub struct MemoryMetricsStore {
    /// The persisted snapshots
    snapshots: Mutex<Vec<MetricsSnapshot>>,
    /// The persisted cursor
    cursor: Mutex<Option<u64>>,
    /// The number of persist attempts
    persist_calls: AtomicUsize,
    /// Whether persists fail
    failing: AtomicBool,
    /// A gate the next persist waits on
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryMetricsStore {
    /// The number of persist attempts so far
    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// The snapshots persisted so far
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    /// Toggle persist failures
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Hold the next persist until the returned gate is notified
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl MetricsStore for MemoryMetricsStore {
    async fn persist_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<(), DbError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(DbError::pool_connection("injected persist failure"));
        }

        self.snapshots.lock().unwrap().push(snapshot.clone());
        let mut cursor = self.cursor.lock().unwrap();
        let scanned_through = snapshot.scanned_through;
        *cursor = Some(cursor.map_or(scanned_through, |c| c.max(scanned_through)));
        Ok(())
    }

    async fn load_cursor(&self) -> Result<Option<u64>, DbError> {
        Ok(*self.cursor.lock().unwrap())
    }
}

/// A secret provider held in memory
#[derive(Default)]
pub struct MemorySecretProvider {
    /// The secrets by round id
    secrets: Mutex<HashMap<u64, Vec<u8>>>,
    /// Whether reads fail
    failing: AtomicBool,
}

impl MemorySecretProvider {
    /// Publish a round's secret
    pub fn insert(&self, round_id: u64, secret: &str) {
        self.secrets.lock().unwrap().insert(round_id, secret.as_bytes().to_vec());
    }

    /// Whether a round's secret is present
    pub fn contains(&self, round_id: u64) -> bool {
        self.secrets.lock().unwrap().contains_key(&round_id)
    }

    /// Toggle read failures
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretProvider for MemorySecretProvider {
    async fn get_secret(&self, round_id: u64) -> Result<Option<SecretHandle>, SecretsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SecretsError::retrieval("injected secret store failure"));
        }

        let secrets = self.secrets.lock().unwrap();
        Ok(secrets.get(&round_id).map(|value| SecretHandle::new(round_id, value.clone())))
    }

    async fn erase(&self, round_id: u64) -> Result<(), SecretsError> {
        self.secrets.lock().unwrap().remove(&round_id);
        Ok(())
    }
}
