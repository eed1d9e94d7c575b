//! Intake scheduler: paced, single-flight fingerprinting.
//!
//! The fingerprint source is a scarce, rate-limited resource, so intake is
//! strictly serial. One worker task pulls one candidate at a time,
//! fingerprints it under a timeout, records it, then cools down for a fixed
//! delay before pulling the next one.
//!
//! ```text
//!   enqueue ──► [queue] ──► Idle ──► Draining(item) ──► Cooling(delay) ──► Idle
//! ```
//!
//! Failures are confined to their item: a timed-out or unfetchable item is
//! dropped for this pass (no record, no automatic retry) and the worker moves
//! on after the usual cooldown. Re-enqueueing the identity later processes
//! it again. The only fatal condition is a broken serialization invariant,
//! which halts the worker.

mod queue;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use self::queue::PendingQueue;
use crate::error::{RepostError, Result};
use crate::fingerprint::{Fingerprint, FingerprintSource};
use crate::index::DuplicateIndex;
use crate::intake::Candidate;
use crate::matcher::MatchResult;
use crate::record::Record;
use crate::store::{InsertOutcome, RecordStore};

/// Default bound on one fingerprint computation, fallback included.
pub const DEFAULT_FINGERPRINT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause between consecutive drains.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub fingerprint_timeout: Duration,
    pub cooldown: Duration,
    /// Fallback route: the primary locator is passed as its `url` query
    /// parameter when the direct fetch fails.
    pub proxy_url: Option<Url>,
    /// Buffer size of the event channel
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fingerprint_timeout: DEFAULT_FINGERPRINT_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
            proxy_url: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// Fallback locator for `locator`, if a proxy is configured.
    pub fn fallback_locator(&self, locator: &str) -> Option<String> {
        let mut url = self.proxy_url.clone()?;
        url.query_pairs_mut().append_pair("url", locator);
        Some(url.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Draining { identity: String },
    Cooling { delay_ms: u64 },
    /// Stopped after a serialization invariant was violated
    Halted,
    /// Shut down by the owner
    Stopped,
}

impl SchedulerState {
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Halted | Self::Stopped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Items waiting, not counting the one in flight
    pub queued: usize,
    /// Fingerprint source invocations
    pub drained: u64,
    pub recorded: u64,
    pub failed: u64,
    /// Items found already recorded, before or after fingerprinting
    pub skipped: u64,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            queued: 0,
            drained: 0,
            recorded: 0,
            failed: 0,
            skipped: 0,
        }
    }
}

impl SchedulerStatus {
    pub fn is_idle(&self) -> bool {
        self.state == SchedulerState::Idle && self.queued == 0
    }
}

/// Outcome of [`IntakeScheduler::enqueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueSummary {
    pub accepted: usize,
    /// Already pending or in flight (or repeated within the batch)
    pub already_queued: usize,
    /// Already a record; no fingerprinting needed
    pub already_recorded: usize,
}

/// Per-item notifications, in drain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IntakeEvent {
    Recorded {
        identity: String,
        result: MatchResult,
    },
    Failed {
        identity: String,
        reason: String,
    },
    Skipped {
        identity: String,
    },
}

impl IntakeEvent {
    pub fn identity(&self) -> &str {
        match self {
            Self::Recorded { identity, .. }
            | Self::Failed { identity, .. }
            | Self::Skipped { identity } => identity,
        }
    }
}

/// What happened to one drained item.
enum Drained {
    Recorded(MatchResult),
    Failed(RepostError),
    /// Already on record before the source was called.
    Skipped,
    /// Fingerprinted, but another writer recorded the identity first.
    RecordedElsewhere,
}

struct Shared {
    config: SchedulerConfig,
    store: Arc<dyn RecordStore>,
    index: Arc<DuplicateIndex>,
    source: Arc<dyn FingerprintSource>,
    queue: Mutex<PendingQueue>,
    wake: Notify,
    status: watch::Sender<SchedulerStatus>,
    events: broadcast::Sender<IntakeEvent>,
    draining: AtomicBool,
    shutdown: watch::Sender<bool>,
}

/// Owns the pending queue and the single drain worker.
///
/// Must be created inside a Tokio runtime. Dropping the scheduler signals
/// the worker to stop; call [`shutdown`](Self::shutdown) to also wait for
/// it.
pub struct IntakeScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IntakeScheduler {
    /// Spawn the drain worker.
    pub fn start(
        config: SchedulerConfig,
        store: Arc<dyn RecordStore>,
        index: Arc<DuplicateIndex>,
        source: Arc<dyn FingerprintSource>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (status, _) = watch::channel(SchedulerStatus::default());
        let (shutdown, _) = watch::channel(false);

        info!(
            source = %source.source_id(),
            store = %store.backend(),
            cooldown_ms = config.cooldown.as_millis() as u64,
            timeout_ms = config.fingerprint_timeout.as_millis() as u64,
            "Starting intake scheduler"
        );

        let shared = Arc::new(Shared {
            config,
            store,
            index,
            source,
            queue: Mutex::new(PendingQueue::default()),
            wake: Notify::new(),
            status,
            events,
            draining: AtomicBool::new(false),
            shutdown,
        });

        let worker = tokio::spawn(run_worker(shared.clone()));

        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    pub fn index(&self) -> &Arc<DuplicateIndex> {
        &self.shared.index
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.shared.store
    }

    /// Append candidates to the queue tail.
    ///
    /// Candidates whose identity is already queued, in flight, or stored are
    /// skipped. The accepted candidates are appended together, in order.
    #[instrument(level = "debug", skip_all, fields(batch = items.len()))]
    pub async fn enqueue(&self, items: Vec<Candidate>) -> Result<EnqueueSummary> {
        if !self.status().state.is_running() {
            return Err(RepostError::SchedulerStopped);
        }

        let mut summary = EnqueueSummary::default();
        let mut seen = std::collections::HashSet::new();
        let mut fresh = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.identity.clone()) {
                summary.already_queued += 1;
            } else if self.shared.store.get(&item.identity).await?.is_some() {
                summary.already_recorded += 1;
            } else {
                fresh.push(item);
            }
        }

        {
            let mut queue = self.shared.lock_queue()?;
            for item in fresh {
                if queue.push(item) {
                    summary.accepted += 1;
                } else {
                    summary.already_queued += 1;
                }
            }
            let queued = queue.len();
            self.shared.status.send_modify(|s| s.queued = queued);
        }

        if summary.accepted > 0 {
            self.shared.wake.notify_one();
        }
        debug!(
            accepted = summary.accepted,
            already_queued = summary.already_queued,
            already_recorded = summary.already_recorded,
            "Enqueued batch"
        );
        Ok(summary)
    }

    /// Discard every pending item. An in-flight drain is unaffected.
    pub fn cancel_pending(&self) -> Result<usize> {
        let mut queue = self.shared.lock_queue()?;
        let discarded = queue.clear();
        self.shared.status.send_modify(|s| s.queued = 0);
        info!(discarded, "Cancelled pending intake");
        Ok(discarded)
    }

    pub fn status(&self) -> SchedulerStatus {
        self.shared.status.borrow().clone()
    }

    /// Watch status changes.
    pub fn watch_status(&self) -> watch::Receiver<SchedulerStatus> {
        self.shared.status.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntakeEvent> {
        self.shared.events.subscribe()
    }

    /// Resolve once the queue is empty and the worker is idle.
    pub async fn wait_until_idle(&self) -> Result<()> {
        let mut status = self.shared.status.subscribe();
        let state = status
            .wait_for(|s| s.is_idle() || !s.state.is_running())
            .await
            .map_err(|_| RepostError::SchedulerStopped)?
            .state
            .clone();

        match state {
            SchedulerState::Halted => Err(RepostError::SchedulerInvariant(
                "scheduler halted".into(),
            )),
            SchedulerState::Stopped => Err(RepostError::SchedulerStopped),
            _ => Ok(()),
        }
    }

    /// Stop the worker and wait for it.
    ///
    /// Interrupts an idle wait or a cooldown immediately; an in-flight drain
    /// runs to completion first.
    pub async fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Intake worker panicked");
            }
        }
        self.shared.status.send_modify(|s| {
            if s.state != SchedulerState::Halted {
                s.state = SchedulerState::Stopped;
            }
        });
        info!("Intake scheduler stopped");
    }
}

impl Drop for IntakeScheduler {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
    }
}

async fn run_worker(shared: Arc<Shared>) {
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        let item = match shared.pop() {
            Ok(item) => item,
            Err(e) => {
                shared.halt(&e);
                return;
            }
        };

        let Some(item) = item else {
            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = shutdown.changed() => {}
            }
            continue;
        };

        let cool = match shared.drain(item).await {
            Ok(cool) => cool,
            Err(e) => {
                shared.halt(&e);
                return;
            }
        };

        if cool && !shared.config.cooldown.is_zero() {
            let delay = shared.config.cooldown;
            shared.set_state(SchedulerState::Cooling {
                delay_ms: delay.as_millis() as u64,
            });
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    shared.set_state(SchedulerState::Idle);
                    break;
                }
            }
        }
        shared.set_state(SchedulerState::Idle);
    }

    debug!("Intake worker exiting");
}

impl Shared {
    fn lock_queue(&self) -> Result<std::sync::MutexGuard<'_, PendingQueue>> {
        self.queue
            .lock()
            .map_err(|_| RepostError::SchedulerInvariant("intake queue lock poisoned".into()))
    }

    fn set_state(&self, state: SchedulerState) {
        self.status.send_modify(|s| s.state = state);
    }

    fn halt(&self, e: &RepostError) {
        error!(error = %e, "Intake scheduler halted");
        self.set_state(SchedulerState::Halted);
    }

    fn emit(&self, event: IntakeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Pop the head item and enter `Draining` in one step.
    fn pop(&self) -> Result<Option<Candidate>> {
        let mut queue = self.lock_queue()?;
        let item = queue.pop_front();
        let queued = queue.len();
        self.status.send_modify(|s| {
            s.queued = queued;
            if let Some(item) = &item {
                s.state = SchedulerState::Draining {
                    identity: item.identity.clone(),
                };
            }
        });
        Ok(item)
    }

    /// Process one item. Returns whether a cooldown must follow; `Err` only
    /// for a violated serialization invariant.
    async fn drain(&self, item: Candidate) -> Result<bool> {
        if self.draining.swap(true, Ordering::AcqRel) {
            return Err(RepostError::SchedulerInvariant(format!(
                "second concurrent drain started for {}",
                item.identity
            )));
        }

        let identity = item.identity.clone();
        let outcome = self.process(item).await;
        self.draining.store(false, Ordering::Release);
        self.lock_queue()?.finish();

        // Only an item that never reached the source skips the cooldown.
        let cool = !matches!(outcome, Drained::Skipped);
        match outcome {
            Drained::Recorded(result) => {
                self.status.send_modify(|s| {
                    s.drained += 1;
                    s.recorded += 1;
                });
                self.emit(IntakeEvent::Recorded { identity, result });
            }
            Drained::Failed(e) => {
                warn!(identity = %identity, error = %e, "Intake item dropped");
                let fingerprinted = !matches!(e, RepostError::StoreUnavailable(_));
                self.status.send_modify(|s| {
                    if fingerprinted {
                        s.drained += 1;
                    }
                    s.failed += 1;
                });
                self.emit(IntakeEvent::Failed {
                    identity,
                    reason: e.to_string(),
                });
            }
            Drained::Skipped => {
                self.status.send_modify(|s| s.skipped += 1);
                self.emit(IntakeEvent::Skipped { identity });
            }
            Drained::RecordedElsewhere => {
                self.status.send_modify(|s| {
                    s.drained += 1;
                    s.skipped += 1;
                });
                self.emit(IntakeEvent::Skipped { identity });
            }
        }
        Ok(cool)
    }

    #[instrument(level = "info", skip_all, fields(identity = %item.identity))]
    async fn process(&self, item: Candidate) -> Drained {
        match self.store.get(&item.identity).await {
            Ok(Some(_)) => {
                debug!("Already recorded, skipping");
                return Drained::Skipped;
            }
            Ok(None) => {}
            Err(e) => return Drained::Failed(e.into()),
        }

        let fingerprint = match self.fingerprint(&item.content_locator).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => return Drained::Failed(e),
        };

        let record = Record::from_candidate(item, fingerprint, Utc::now());
        match self.store.insert(record.clone()).await {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyPresent) => {
                debug!("Recorded concurrently, keeping the first record");
                return Drained::RecordedElsewhere;
            }
            Err(e) => return Drained::Failed(e.into()),
        }

        match self.index.record_inserted(&record).await {
            Ok(result) => {
                info!(
                    is_duplicate = result.is_duplicate,
                    match_count = result.match_count,
                    "Recorded"
                );
                Drained::Recorded(result)
            }
            Err(e) => {
                // Stored; the index computes it lazily on the next read.
                warn!(error = %e, "Recorded but not indexed");
                Drained::Recorded(MatchResult::from_matches(Vec::new(), self.index.config()))
            }
        }
    }

    /// Primary locator, then the proxy fallback, all under one timeout.
    async fn fingerprint(&self, locator: &str) -> Result<Fingerprint> {
        let bound = self.config.fingerprint_timeout;
        let attempt = async {
            let primary = match self.source.fingerprint(locator).await {
                Ok(fingerprint) => return Ok(fingerprint),
                Err(e) => e,
            };
            let Some(fallback) = self.config.fallback_locator(locator) else {
                return Err(primary);
            };

            debug!(error = %primary, "Primary fetch failed, trying proxy");
            self.source.fingerprint(&fallback).await.map_err(|e| {
                RepostError::FingerprintUnavailable(format!(
                    "primary: {primary}; fallback: {e}"
                ))
            })
        };

        tokio::time::timeout(bound, attempt)
            .await
            .map_err(|_| RepostError::FingerprintTimeout(bound))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::MockFingerprintSource;
    use crate::matcher::MatcherConfig;
    use crate::store::MemoryRecordStore;

    fn parts(
        source: MockFingerprintSource,
    ) -> (Arc<dyn RecordStore>, Arc<DuplicateIndex>, Arc<dyn FingerprintSource>) {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let index = Arc::new(DuplicateIndex::new(store.clone(), MatcherConfig::default()));
        (store, index, Arc::new(source))
    }

    #[test]
    fn test_fallback_locator_wraps_primary() {
        let config = SchedulerConfig {
            proxy_url: Some(Url::parse("http://localhost:3000/api/download").unwrap()),
            ..Default::default()
        };
        assert_eq!(
            config.fallback_locator("https://i.redd.it/a.jpg?x=1&y=2").as_deref(),
            Some("http://localhost:3000/api/download?url=https%3A%2F%2Fi.redd.it%2Fa.jpg%3Fx%3D1%26y%3D2")
        );
        assert!(SchedulerConfig::default().fallback_locator("x").is_none());
    }

    #[test]
    fn test_status_serializes_state_kind() {
        let status = SchedulerStatus {
            state: SchedulerState::Draining {
                identity: "p1".into(),
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"]["kind"], "draining");
        assert_eq!(json["state"]["identity"], "p1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_drain_halts() {
        let (store, index, source) = parts(MockFingerprintSource::default());
        let scheduler = IntakeScheduler::start(SchedulerConfig::default(), store, index, source);

        scheduler.shared.draining.store(true, Ordering::SeqCst);
        scheduler
            .enqueue(vec![Candidate::new("p1", "loc")])
            .await
            .unwrap();

        let err = scheduler.wait_until_idle().await.unwrap_err();
        assert!(matches!(err, RepostError::SchedulerInvariant(_)));
        assert_eq!(scheduler.status().state, SchedulerState::Halted);
        assert!(matches!(
            scheduler.enqueue(vec![Candidate::new("p2", "loc")]).await,
            Err(RepostError::SchedulerStopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_used_after_primary_failure() {
        let proxy = Url::parse("http://proxy.local/download").unwrap();
        let config = SchedulerConfig {
            proxy_url: Some(proxy),
            ..Default::default()
        };
        let fallback = config.fallback_locator("bad").unwrap();
        let mock = MockFingerprintSource::default().with_failure("bad", "HTTP 403");
        let (store, index, source) = parts(mock.clone());

        let scheduler = IntakeScheduler::start(config, store.clone(), index, source);
        scheduler
            .enqueue(vec![Candidate::new("p1", "bad")])
            .await
            .unwrap();
        scheduler.wait_until_idle().await.unwrap();

        assert_eq!(mock.calls(), vec!["bad".to_string(), fallback]);
        assert!(store.get("p1").await.unwrap().is_some());
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_idle_wait() {
        let (store, index, source) = parts(MockFingerprintSource::default());
        let scheduler = IntakeScheduler::start(SchedulerConfig::default(), store, index, source);

        scheduler.shutdown().await;
        assert_eq!(scheduler.status().state, SchedulerState::Stopped);
        assert!(matches!(
            scheduler.wait_until_idle().await,
            Err(RepostError::SchedulerStopped)
        ));
    }
}
