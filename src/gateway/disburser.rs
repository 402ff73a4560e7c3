// Disburser - Delivers queued ledger transfers to an external payout system
// The ledger has already debited custody; this only moves the currency

use crate::identity::Address;
use crate::ledger::{Amount, Transfer, TransferKind};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// PAYOUT TARGET TRAIT
// ============================================================================

/// Trait for payout systems (bank rails, chain bridges, ...)
#[async_trait]
pub trait PayoutTarget: Send + Sync {
    /// Deliver one transfer
    /// Returns an external reference on success, error message on failure
    async fn pay(&self, transfer: &Transfer) -> Result<String, String>;
}

// ============================================================================
// MOCK PAYOUT TARGET
// ============================================================================

/// Mock implementation of PayoutTarget for testing
pub struct MockPayoutTarget {
    should_succeed: bool,
    failure_message: Option<String>,
    delay_ms: u64,
    failures_before_success: AtomicUsize,
    call_count: AtomicUsize,
}

impl MockPayoutTarget {
    /// Create a new mock target (defaults to failure)
    pub fn new() -> Self {
        Self {
            should_succeed: false,
            failure_message: None,
            delay_ms: 0,
            failures_before_success: AtomicUsize::new(0),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_success(mut self) -> Self {
        self.should_succeed = true;
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.should_succeed = false;
        self.failure_message = Some(message.to_string());
        self
    }

    /// Add a delay before responding
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Fail N times, then succeed
    pub fn with_failures_then_success(mut self, failures: usize) -> Self {
        self.should_succeed = true;
        self.failures_before_success = AtomicUsize::new(failures);
        self
    }

    /// Number of delivery attempts seen
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockPayoutTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayoutTarget for MockPayoutTarget {
    async fn pay(&self, transfer: &Transfer) -> Result<String, String> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        let failures = self.failures_before_success.load(Ordering::SeqCst);
        let failure = || {
            self.failure_message
                .clone()
                .unwrap_or_else(|| "Mock failure".to_string())
        };

        if call_num < failures || !self.should_succeed {
            return Err(failure());
        }
        Ok(format!("payout-mock-{}-{}", transfer.id(), call_num))
    }
}

// ============================================================================
// LOGGING PAYOUT TARGET
// ============================================================================

/// Target that records each payout in the log and succeeds
///
/// Used by the operator CLI when no external rail is wired in.
pub struct LoggingPayoutTarget;

#[async_trait]
impl PayoutTarget for LoggingPayoutTarget {
    async fn pay(&self, transfer: &Transfer) -> Result<String, String> {
        info!(
            id = transfer.id(),
            to = %transfer.to(),
            amount = %transfer.amount(),
            kind = ?transfer.kind(),
            "Payout delivered"
        );
        Ok(format!("log-{}", transfer.id()))
    }
}

// ============================================================================
// PAYOUT RECEIPT
// ============================================================================

/// Receipt for a delivered transfer
#[derive(Clone, Debug)]
pub struct PayoutReceipt {
    transfer_id: u64,
    to: Address,
    amount: Amount,
    kind: TransferKind,
    reference: String,
    attempts: u32,
    timestamp: u64,
}

impl PayoutReceipt {
    fn new(transfer: &Transfer, reference: String, attempts: u32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            transfer_id: transfer.id(),
            to: *transfer.to(),
            amount: transfer.amount(),
            kind: transfer.kind(),
            reference,
            attempts,
            timestamp,
        }
    }

    pub fn transfer_id(&self) -> u64 {
        self.transfer_id
    }

    pub fn to(&self) -> &Address {
        &self.to
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    /// Reference assigned by the payout system
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

// ============================================================================
// PAYOUT FAILURE
// ============================================================================

/// A transfer that exhausted its retries
#[derive(Clone, Debug)]
pub struct PayoutFailure {
    pub transfer: Transfer,
    pub error: String,
    pub attempts: u32,
}

// ============================================================================
// DISBURSER EVENTS
// ============================================================================

/// Events emitted by the disburser
#[derive(Clone, Debug)]
pub enum DisburserEvent {
    TransferQueued { transfer_id: u64, amount: Amount },
    PayoutDelivered { transfer_id: u64, reference: String, attempts: u32 },
    PayoutFailed { transfer_id: u64, error: String, attempts: u32 },
}

// ============================================================================
// DISBURSER CONFIG
// ============================================================================

/// Configuration for the disburser
#[derive(Clone, Debug)]
pub struct DisburserConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Timeout for each attempt in seconds
    pub timeout_secs: u64,
}

impl DisburserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DisburserError> {
        if self.timeout_secs == 0 {
            return Err(DisburserError::InvalidConfig(
                "timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DisburserConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// DISBURSER STATS
// ============================================================================

/// Statistics about disburser operations
#[derive(Clone, Debug, Default)]
pub struct DisburserStats {
    pub transfers_queued: u64,
    pub payouts_delivered: u64,
    pub payouts_failed: u64,
    pub amount_delivered: Amount,
}

// ============================================================================
// DISBURSER ERROR
// ============================================================================

#[derive(Error, Debug)]
pub enum DisburserError {
    #[error("Duplicate transfer: {0} already queued or delivered")]
    DuplicateTransfer(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// DISBURSER
// ============================================================================

/// Transfer ids the target has accepted
///
/// Ledger ids are sequential, so a contiguous delivered prefix collapses
/// into `floor` and only out-of-order deliveries are kept individually.
#[derive(Clone, Debug, Default)]
struct DeliveredIds {
    /// Every id below this has been delivered
    floor: u64,
    above: BTreeSet<u64>,
}

impl DeliveredIds {
    fn contains(&self, id: u64) -> bool {
        id < self.floor || self.above.contains(&id)
    }

    fn insert(&mut self, id: u64) {
        if id < self.floor {
            return;
        }
        self.above.insert(id);
        while self.above.remove(&self.floor) {
            self.floor += 1;
        }
    }

    fn len(&self) -> usize {
        self.above.len()
    }
}

/// Delivers ledger transfers, retrying each up to the configured limit
///
/// A transfer that exhausts its retries is handed back to the caller in a
/// [`PayoutFailure`] and forgotten here; returning it to the ledger with
/// `FlightLedger::requeue_transfers` is the only retry path.
pub struct Disburser {
    config: DisburserConfig,
    target: Box<dyn PayoutTarget>,
    queue: VecDeque<Transfer>,
    /// Ids currently queued
    queued: HashSet<u64>,
    delivered: DeliveredIds,
    receipts: HashMap<u64, PayoutReceipt>,
    events: Vec<DisburserEvent>,
    stats: DisburserStats,
}

impl Disburser {
    pub fn new(config: DisburserConfig, target: Box<dyn PayoutTarget>) -> Result<Self, DisburserError> {
        config.validate()?;
        Ok(Self {
            config,
            target,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            delivered: DeliveredIds::default(),
            receipts: HashMap::new(),
            events: Vec::new(),
            stats: DisburserStats::default(),
        })
    }

    /// Queue transfers drained from the ledger; returns how many were added
    ///
    /// The whole batch is refused if any transfer is already queued or was
    /// delivered. The caller keeps the batch either way.
    pub fn enqueue(&mut self, transfers: &[Transfer]) -> Result<usize, DisburserError> {
        let mut batch_ids = HashSet::new();
        for transfer in transfers {
            let id = transfer.id();
            if self.queued.contains(&id) || self.delivered.contains(id) || !batch_ids.insert(id) {
                return Err(DisburserError::DuplicateTransfer(id));
            }
        }

        for transfer in transfers {
            self.queued.insert(transfer.id());
            self.events.push(DisburserEvent::TransferQueued {
                transfer_id: transfer.id(),
                amount: transfer.amount(),
            });
            self.queue.push_back(transfer.clone());
        }
        self.stats.transfers_queued += transfers.len() as u64;
        Ok(transfers.len())
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether a transfer id has been delivered by this disburser
    pub fn is_delivered(&self, transfer_id: u64) -> bool {
        self.delivered.contains(transfer_id)
    }

    /// Deliver the next queued transfer
    ///
    /// Returns `None` when the queue is empty.
    pub async fn process_next(&mut self) -> Option<Result<PayoutReceipt, PayoutFailure>> {
        let transfer = self.queue.pop_front()?;
        self.queued.remove(&transfer.id());
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let mut attempts = 0u32;
        let last_error = loop {
            attempts += 1;

            let outcome = tokio::time::timeout(timeout, self.target.pay(&transfer)).await;
            let error = match outcome {
                Ok(Ok(reference)) => return Some(Ok(self.record_delivery(&transfer, reference, attempts))),
                Ok(Err(e)) => e,
                Err(_) => "Timeout".to_string(),
            };

            if attempts > self.config.max_retries {
                break error;
            }
            if self.config.retry_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        };

        warn!(transfer = transfer.id(), error = %last_error, attempts, "Payout failed");
        self.stats.payouts_failed += 1;
        self.events.push(DisburserEvent::PayoutFailed {
            transfer_id: transfer.id(),
            error: last_error.clone(),
            attempts,
        });
        Some(Err(PayoutFailure {
            transfer,
            error: last_error,
            attempts,
        }))
    }

    fn record_delivery(&mut self, transfer: &Transfer, reference: String, attempts: u32) -> PayoutReceipt {
        let receipt = PayoutReceipt::new(transfer, reference.clone(), attempts);
        self.delivered.insert(transfer.id());
        self.stats.payouts_delivered += 1;
        self.stats.amount_delivered = self.stats.amount_delivered.saturating_add(transfer.amount());
        self.events.push(DisburserEvent::PayoutDelivered {
            transfer_id: transfer.id(),
            reference,
            attempts,
        });
        self.receipts.insert(transfer.id(), receipt.clone());
        receipt
    }

    /// Deliver everything queued, in order
    pub async fn process_all(&mut self) -> Vec<Result<PayoutReceipt, PayoutFailure>> {
        let mut results = Vec::with_capacity(self.queue.len());
        while let Some(result) = self.process_next().await {
            results.push(result);
        }
        results
    }

    pub fn receipt(&self, transfer_id: u64) -> Option<&PayoutReceipt> {
        self.receipts.get(&transfer_id)
    }

    /// Hand over all receipts collected so far (clears them)
    ///
    /// Delivered ids are still remembered, so a drained receipt's transfer
    /// cannot be queued again.
    pub fn take_receipts(&mut self) -> Vec<PayoutReceipt> {
        let mut receipts: Vec<PayoutReceipt> = std::mem::take(&mut self.receipts).into_values().collect();
        receipts.sort_by_key(|r| r.transfer_id());
        receipts
    }

    /// Delivered ids tracked individually, i.e. above the contiguous prefix
    pub fn sparse_delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// Poll for events (clears the event queue)
    pub fn poll_events(&mut self) -> Vec<DisburserEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> &DisburserStats {
        &self.stats
    }
}
