//! The sync engine — orchestrates the catch-up and live phases.
//!
//! # Phase 1: CATCH-UP
//! Scan bounded windows from the cursor up to the chain head, one pass at a
//! time. A pass that completes more than one window may have raced a moving
//! head, so another pass follows; a pass that was cut short by a recoverable
//! error is retried after a backoff. Catch-up ends only when an untruncated
//! pass finishes within a single window.
//!
//! # Phase 2: LIVE
//! Subscribe to pushed head notifications. Heights are admitted through a
//! bounded FIFO gate and consumed strictly one at a time; each new head
//! opens the window `[cursor + 1, head]`, which is processed exactly like a
//! catch-up window. Gaps between notifications are therefore covered by
//! construction.
//!
//! Every dispatched log moves the durable cursor forward, so a crash at any
//! point resumes without replaying a handled log.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineState, SyncConfig};
use crate::cursor::Cursor;
use crate::error::SyncError;
use crate::gate::{Gate, GateQueue};
use crate::router::{LogRouter, RouteOutcome};
use crate::source::{ChainSource, HeightStream};
use crate::state::SyncStateStore;
use crate::types::{BlockRange, SyncContext, SyncPhase};

// ─── Metrics ──────────────────────────────────────────────────────────────────

/// Counters accumulated over an engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    /// Logs decoded and handled.
    pub dispatched: u64,
    /// Logs from watched contracts that did not decode.
    pub undecodable: u64,
    /// Decoded events with no registered handler.
    pub unrouted: u64,
    /// Logs from addresses the engine does not watch.
    pub unmatched: u64,
    /// Handler failures tolerated under [`crate::config::FailurePolicy::Skip`].
    pub handler_failures: u64,
    /// Scan windows completed across all passes.
    pub windows_completed: u64,
    /// Catch-up passes started.
    pub passes: u64,
    /// Catch-up passes cut short by a recoverable error.
    pub truncated_passes: u64,
}

// ─── Shutdown ─────────────────────────────────────────────────────────────────

/// Requests a graceful stop of a running engine.
///
/// The engine finishes the log it is dispatching, persists the cursor, and
/// returns from [`SyncEngine::run`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    /// Ask the engine to stop.
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Accounting for a single catch-up pass.
struct PassOutcome {
    windows_completed: u64,
    truncated: bool,
}

/// The block-range sync engine.
///
/// Generic over the [`ChainSource`] so the scan logic stays chain-agnostic;
/// `logsync-evm` supplies the JSON-RPC-backed source.
pub struct SyncEngine<S: ChainSource> {
    config: SyncConfig,
    source: S,
    router: LogRouter,
    store: Arc<dyn SyncStateStore>,
    cursor: Cursor,
    state: EngineState,
    metrics: Arc<Mutex<SyncMetrics>>,
    shutdown: CancellationToken,
}

impl<S: ChainSource> SyncEngine<S> {
    pub fn new(
        config: SyncConfig,
        source: S,
        router: LogRouter,
        store: Arc<dyn SyncStateStore>,
    ) -> (Self, ShutdownHandle) {
        let token = CancellationToken::new();
        let handle = ShutdownHandle {
            token: token.clone(),
        };
        let cursor = Cursor::start_at(config.start_block);
        (
            Self {
                config,
                source,
                router,
                store,
                cursor,
                state: EngineState::Init,
                metrics: Arc::new(Mutex::new(SyncMetrics::default())),
                shutdown: token,
            },
            handle,
        )
    }

    /// The engine's current runtime state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The engine's current cursor position.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Snapshot of the run counters.
    pub fn metrics(&self) -> SyncMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// Run the engine until the height stream ends, shutdown is requested,
    /// or a fatal error occurs.
    pub async fn run(&mut self) -> Result<(), SyncError> {
        let result = self.run_inner().await;
        self.state = EngineState::Stopped;
        result
    }

    async fn run_inner(&mut self) -> Result<(), SyncError> {
        match self.store.load(&self.config.id).await? {
            Some(cursor) => {
                self.cursor = cursor;
                info!(
                    block = cursor.block,
                    position = cursor.log_position,
                    "Resuming from stored cursor"
                );
            }
            None => {
                self.cursor = Cursor::start_at(self.config.start_block);
                info!(block = self.cursor.block, "No stored cursor; starting fresh");
            }
        }

        self.state = EngineState::CatchingUp;
        self.catch_up().await?;

        if self.shutdown.is_cancelled() {
            return Ok(());
        }

        self.state = EngineState::Live;
        self.live().await
    }

    // ─── Catch-up phase ───────────────────────────────────────────────────────

    async fn catch_up(&mut self) -> Result<(), SyncError> {
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            let head = match self.source.current_height().await {
                Ok(head) => head,
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, "Head query failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            info!(head, from = self.cursor.block, "Starting catch-up pass");
            let outcome = self.scan_pass(head).await?;
            {
                let mut m = self.metrics.lock().unwrap();
                m.passes += 1;
                if outcome.truncated {
                    m.truncated_passes += 1;
                }
            }

            if outcome.truncated {
                warn!(
                    windows = outcome.windows_completed,
                    "Pass truncated; backing off before rescan"
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if outcome.windows_completed <= 1 {
                info!(head, "Caught up to head");
                return Ok(());
            }
            // More than one window: the head may have moved while we
            // scanned, so take another pass.
        }
    }

    /// One pass from the cursor to `head`.
    ///
    /// A recoverable window failure ends the pass early with `truncated`
    /// set; the cursor stays wherever the failed window left it.
    async fn scan_pass(&mut self, head: u64) -> Result<PassOutcome, SyncError> {
        let mut windows_completed = 0u64;
        let mut from = self.cursor.block;

        while from < head {
            if self.shutdown.is_cancelled() {
                break;
            }

            let to = (from + self.config.block_batch).min(head);
            match self
                .process_window(BlockRange::new(from, to), SyncPhase::CatchUp)
                .await
            {
                Ok(()) => {
                    windows_completed += 1;
                    self.metrics.lock().unwrap().windows_completed += 1;
                }
                Err(e) if !e.is_fatal() => {
                    warn!(from, to, error = %e, "Window failed; truncating pass");
                    return Ok(PassOutcome {
                        windows_completed,
                        truncated: true,
                    });
                }
                Err(e) => return Err(e),
            }

            from += self.config.block_batch;
        }

        Ok(PassOutcome {
            windows_completed,
            truncated: false,
        })
    }

    // ─── Live phase ───────────────────────────────────────────────────────────

    async fn live(&mut self) -> Result<(), SyncError> {
        let heights = self.source.subscribe_heights().await?;
        let (gate, mut queue) = Gate::bounded(self.config.gate_capacity);
        let forwarder = tokio::spawn(forward_heights(heights, gate));

        info!(cursor = self.cursor.block, "Entering live mode");
        let result = self.follow(&mut queue).await;
        forwarder.abort();
        result
    }

    async fn follow(
        &mut self,
        queue: &mut GateQueue<Result<u64, SyncError>>,
    ) -> Result<(), SyncError> {
        let shutdown = self.shutdown.clone();

        loop {
            let item = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested; leaving live mode");
                    return Ok(());
                }
                item = queue.next() => item,
            };

            let height = match item {
                None => {
                    info!("Height stream ended");
                    return Ok(());
                }
                Some(Err(e)) => {
                    return Err(match e {
                        SyncError::Subscription(_) => e,
                        other => SyncError::Subscription(other.to_string()),
                    });
                }
                Some(Ok(height)) => height,
            };

            if height <= self.cursor.block {
                debug!(
                    height,
                    cursor = self.cursor.block,
                    "Stale height notification skipped"
                );
                continue;
            }

            let range = BlockRange::new(self.cursor.block + 1, height);
            match self.process_window(range, SyncPhase::Live).await {
                Ok(()) => {}
                Err(e) if !e.is_fatal() => {
                    warn!(
                        from = range.from,
                        to = range.to,
                        error = %e,
                        "Live window failed; next height re-covers the gap"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ─── Window processing ────────────────────────────────────────────────────

    /// Scan one inclusive block window: fetch, route each uncovered log in
    /// order, persist the cursor per log, then mark the window drained.
    async fn process_window(
        &mut self,
        range: BlockRange,
        phase: SyncPhase,
    ) -> Result<(), SyncError> {
        let logs = self.source.logs_in_range(range).await?;
        let mut observed = range.from;

        for log in &logs {
            if log.block_number > observed {
                let drained = log.block_number - 1;
                let ctx = self.context(phase, drained);
                self.router.notify_block_drained(drained, &ctx).await?;
                observed = log.block_number;
            }

            if self.cursor.covers(log.block_number, log.log_index) {
                continue;
            }

            let ctx = self.context(phase, log.block_number);
            let outcome = self.router.route(log, &ctx).await?;
            self.record(&outcome);

            self.cursor.advance_to(log.block_number, log.log_index);
            self.store.save(&self.config.id, &self.cursor).await?;
        }

        self.cursor.complete_through(range.to);
        self.store.save(&self.config.id, &self.cursor).await?;
        let ctx = self.context(phase, range.to);
        self.router.notify_block_drained(range.to, &ctx).await?;

        info!(
            from = range.from,
            to = range.to,
            logs = logs.len(),
            "Window complete"
        );
        Ok(())
    }

    fn context(&self, phase: SyncPhase, block: u64) -> SyncContext {
        SyncContext {
            engine_id: self.config.id.clone(),
            phase,
            block,
        }
    }

    fn record(&self, outcome: &RouteOutcome) {
        let mut m = self.metrics.lock().unwrap();
        match outcome {
            RouteOutcome::Dispatched { .. } => m.dispatched += 1,
            RouteOutcome::SkippedUndecodable => m.undecodable += 1,
            RouteOutcome::Unrouted { .. } => m.unrouted += 1,
            RouteOutcome::Unmatched => m.unmatched += 1,
            RouteOutcome::HandlerFailed { .. } => m.handler_failures += 1,
        }
    }
}

/// Pump the raw height stream into the gate. Ends when either side closes.
async fn forward_heights(mut heights: HeightStream, gate: Gate<Result<u64, SyncError>>) {
    while let Some(item) = heights.next().await {
        if gate.admit(item).await.is_err() {
            break;
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use crate::contracts::{ContractSet, StaticContract};
    use crate::decode::{DecodeError, LogDecoder};
    use crate::error::HandlerError;
    use crate::routes::{BlockDrainedHandler, EventHandler, RoutingTable};
    use crate::schema::{EventSchema, InterfaceSpec};
    use crate::state::MemoryStateStore;
    use crate::types::{DecodedEvent, RawLogEvent};
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};

    const EVENT_TOPIC: &str = "0xaaa111";
    const VAULT_ADDR: &str = "0xva17";

    // ─── Scripted chain source ────────────────────────────────────────────────

    enum HeightScript {
        Items(Vec<Result<u64, SyncError>>),
        Pending,
    }

    struct ScriptedSource {
        heads: Mutex<VecDeque<u64>>,
        last_head: Mutex<u64>,
        logs: Vec<RawLogEvent>,
        fail_gets: Mutex<u32>,
        windows: Mutex<Vec<(u64, u64)>>,
        heights: Mutex<Option<HeightScript>>,
    }

    impl ScriptedSource {
        fn new(heads: Vec<u64>, logs: Vec<RawLogEvent>) -> Arc<Self> {
            Arc::new(Self {
                heads: Mutex::new(heads.into()),
                last_head: Mutex::new(0),
                logs,
                fail_gets: Mutex::new(0),
                windows: Mutex::new(vec![]),
                heights: Mutex::new(None),
            })
        }

        fn script_heights(self: &Arc<Self>, items: Vec<Result<u64, SyncError>>) -> Arc<Self> {
            *self.heights.lock().unwrap() = Some(HeightScript::Items(items));
            self.clone()
        }

        fn script_pending_heights(self: &Arc<Self>) -> Arc<Self> {
            *self.heights.lock().unwrap() = Some(HeightScript::Pending);
            self.clone()
        }

        fn fail_next_fetches(self: &Arc<Self>, count: u32) -> Arc<Self> {
            *self.fail_gets.lock().unwrap() = count;
            self.clone()
        }

        fn windows(&self) -> Vec<(u64, u64)> {
            self.windows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainSource for Arc<ScriptedSource> {
        async fn current_height(&self) -> Result<u64, SyncError> {
            let mut heads = self.heads.lock().unwrap();
            let mut last = self.last_head.lock().unwrap();
            if let Some(head) = heads.pop_front() {
                *last = head;
            }
            Ok(*last)
        }

        async fn logs_in_range(&self, range: BlockRange) -> Result<Vec<RawLogEvent>, SyncError> {
            {
                let mut fails = self.fail_gets.lock().unwrap();
                if *fails > 0 {
                    *fails -= 1;
                    return Err(SyncError::Source("injected fault".into()));
                }
            }
            self.windows.lock().unwrap().push((range.from, range.to));
            let mut out: Vec<RawLogEvent> = self
                .logs
                .iter()
                .filter(|l| l.block_number >= range.from && l.block_number <= range.to)
                .cloned()
                .collect();
            out.sort_by_key(|l| (l.block_number, l.log_index));
            Ok(out)
        }

        async fn subscribe_heights(&self) -> Result<HeightStream, SyncError> {
            match self.heights.lock().unwrap().take() {
                Some(HeightScript::Items(items)) => Ok(Box::pin(stream::iter(items))),
                Some(HeightScript::Pending) => Ok(Box::pin(stream::pending())),
                None => Ok(Box::pin(stream::iter(Vec::new()))),
            }
        }
    }

    // ─── Test handlers, decoder, store ────────────────────────────────────────

    struct NameDecoder;

    impl LogDecoder for NameDecoder {
        fn decode(
            &self,
            interface: &InterfaceSpec,
            contract: &str,
            log: &RawLogEvent,
        ) -> Result<DecodedEvent, DecodeError> {
            let topic0 = log.topic0().ok_or(DecodeError::MissingTopic)?;
            let schema =
                interface
                    .event_for_topic(topic0)
                    .ok_or_else(|| DecodeError::UnknownTopic {
                        contract: contract.to_string(),
                        topic: topic0.to_string(),
                    })?;
            Ok(DecodedEvent {
                contract: contract.to_string(),
                event: schema.name.clone(),
                address: log.address.clone(),
                block_number: log.block_number,
                log_index: log.log_index,
                args: HashMap::new(),
            })
        }
    }

    struct Collector {
        seen: Mutex<Vec<(u64, u64)>>,
        active: AtomicU32,
        max_active: AtomicU32,
        delay: Duration,
    }

    impl Collector {
        fn new() -> Arc<Self> {
            Self::slow(Duration::ZERO)
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(vec![]),
                active: AtomicU32::new(0),
                max_active: AtomicU32::new(0),
                delay,
            })
        }

        fn seen(&self) -> Vec<(u64, u64)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventHandler for Collector {
        async fn handle(&self, e: &DecodedEvent, _c: &SyncContext) -> Result<(), HandlerError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.seen
                .lock()
                .unwrap()
                .push((e.block_number, e.log_index));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _e: &DecodedEvent, _c: &SyncContext) -> Result<(), HandlerError> {
            Err(HandlerError::new("db write failed"))
        }
    }

    struct DrainRecorder(Mutex<Vec<u64>>);

    #[async_trait]
    impl BlockDrainedHandler for DrainRecorder {
        async fn block_drained(&self, block: u64, _c: &SyncContext) -> Result<(), HandlerError> {
            self.0.lock().unwrap().push(block);
            Ok(())
        }
    }

    struct RecordingStore {
        inner: MemoryStateStore,
        saved: Mutex<Vec<Cursor>>,
    }

    impl RecordingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryStateStore::new(),
                saved: Mutex::new(vec![]),
            })
        }

        fn saved(&self) -> Vec<Cursor> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SyncStateStore for RecordingStore {
        async fn load(&self, engine_id: &str) -> Result<Option<Cursor>, SyncError> {
            self.inner.load(engine_id).await
        }

        async fn save(&self, engine_id: &str, cursor: &Cursor) -> Result<(), SyncError> {
            self.saved.lock().unwrap().push(*cursor);
            self.inner.save(engine_id, cursor).await
        }

        async fn delete(&self, engine_id: &str) -> Result<(), SyncError> {
            self.inner.delete(engine_id).await
        }
    }

    // ─── Assembly helpers ─────────────────────────────────────────────────────

    fn vault_interface() -> InterfaceSpec {
        InterfaceSpec::new(vec![EventSchema::with_topic0("Ping", EVENT_TOPIC, vec![])])
    }

    fn vault_log(block: u64, index: u64) -> RawLogEvent {
        RawLogEvent {
            address: VAULT_ADDR.into(),
            block_number: block,
            log_index: index,
            topics: vec![EVENT_TOPIC.into()],
            data: vec![],
        }
    }

    fn config(start_block: u64, block_batch: u64) -> SyncConfig {
        SyncConfig {
            id: "sync-test".into(),
            start_block,
            block_batch,
            retry_backoff_ms: 1,
            ..SyncConfig::default()
        }
    }

    fn router_to(handler: Arc<dyn EventHandler>, policy: FailurePolicy) -> LogRouter {
        let mut routes = RoutingTable::new();
        routes.on_event("Vault", "Ping", handler);
        LogRouter::new(
            ContractSet::new(
                vec![StaticContract::new("Vault", VAULT_ADDR, vault_interface())],
                vec![],
            ),
            routes,
            Arc::new(NameDecoder),
            policy,
        )
    }

    // ─── Catch-up ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn single_window_catch_up() {
        let source = ScriptedSource::new(
            vec![130],
            vec![
                vault_log(105, 0),
                vault_log(110, 2),
                vault_log(130, 1),
                // Log from an address nobody watches.
                RawLogEvent {
                    address: "0xnobody".into(),
                    ..vault_log(120, 0)
                },
            ],
        );
        let collector = Collector::new();
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        assert_eq!(source.windows(), vec![(100, 130)]);
        assert_eq!(collector.seen(), vec![(105, 0), (110, 2), (130, 1)]);
        assert_eq!(engine.cursor().position(), (130, Cursor::DRAINED));
        assert_eq!(engine.state(), EngineState::Stopped);

        let metrics = engine.metrics();
        assert_eq!(metrics.passes, 1);
        assert_eq!(metrics.dispatched, 3);
        assert_eq!(metrics.unmatched, 1);
        assert_eq!(metrics.truncated_passes, 0);
    }

    #[tokio::test]
    async fn passes_repeat_until_a_single_window_suffices() {
        // Head at 135 with batch 10 needs four windows; the engine must take
        // a second pass before concluding it is caught up.
        let source = ScriptedSource::new(vec![135, 135], vec![vault_log(110, 0)]);
        let collector = Collector::new();
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 10),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        assert_eq!(
            source.windows(),
            vec![(100, 110), (110, 120), (120, 130), (130, 135)]
        );
        // The boundary log at 110 appears in two windows but is dispatched once.
        assert_eq!(collector.seen(), vec![(110, 0)]);
        assert_eq!(engine.metrics().passes, 2);
        assert_eq!(engine.cursor().position(), (135, Cursor::DRAINED));
    }

    #[tokio::test]
    async fn resumes_from_stored_cursor() {
        let source = ScriptedSource::new(
            vec![106],
            vec![
                vault_log(105, 1),
                vault_log(105, 3),
                vault_log(105, 4),
                vault_log(105, 7),
                vault_log(106, 0),
            ],
        );
        let collector = Collector::new();
        let store = Arc::new(MemoryStateStore::with_cursor(
            "sync-test",
            Cursor {
                block: 105,
                log_position: 3,
            },
        ));
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            store,
        );

        engine.run().await.unwrap();

        // Everything at or before (105, 3) is covered; the rest replays.
        assert_eq!(source.windows(), vec![(105, 106)]);
        assert_eq!(collector.seen(), vec![(105, 4), (105, 7), (106, 0)]);
    }

    #[tokio::test]
    async fn fresh_start_covers_index_zero_of_start_block() {
        let source = ScriptedSource::new(
            vec![101],
            vec![vault_log(100, 0), vault_log(100, 1), vault_log(101, 0)],
        );
        let collector = Collector::new();
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        // A fresh cursor sits at (start, 0), which covers log index 0.
        assert_eq!(collector.seen(), vec![(100, 1), (101, 0)]);
    }

    #[tokio::test]
    async fn truncated_pass_backs_off_and_rescans() {
        let source = ScriptedSource::new(
            vec![120, 120, 120],
            vec![vault_log(101, 0), vault_log(115, 2)],
        )
        .fail_next_fetches(1);
        let collector = Collector::new();
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 10),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        // First pass dies on its first window; the rescan covers everything.
        assert_eq!(source.windows(), vec![(100, 110), (110, 120)]);
        assert_eq!(collector.seen(), vec![(101, 0), (115, 2)]);
        assert_eq!(engine.cursor().position(), (120, Cursor::DRAINED));

        let metrics = engine.metrics();
        assert_eq!(metrics.truncated_passes, 1);
        assert_eq!(metrics.passes, 3);
    }

    // ─── Persistence ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn cursor_is_persisted_per_log_and_per_window() {
        let source = ScriptedSource::new(
            vec![110],
            vec![vault_log(101, 0), vault_log(101, 5), vault_log(102, 1)],
        );
        let store = RecordingStore::new();
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source,
            router_to(Collector::new(), FailurePolicy::Fatal),
            store.clone(),
        );

        engine.run().await.unwrap();

        let saved: Vec<(u64, u64)> = store.saved().iter().map(|c| c.position()).collect();
        assert_eq!(
            saved,
            vec![(101, 0), (101, 5), (102, 1), (110, Cursor::DRAINED)]
        );
        // Durable positions never move backwards.
        assert!(saved.windows(2).all(|w| w[0] <= w[1]));
    }

    // ─── Block-drained hook ───────────────────────────────────────────────────

    #[tokio::test]
    async fn block_drained_fires_on_boundaries() {
        let source = ScriptedSource::new(vec![103], vec![vault_log(101, 0), vault_log(103, 2)]);
        let drains = Arc::new(DrainRecorder(Mutex::new(vec![])));
        let mut routes = RoutingTable::new();
        routes.on_event("Vault", "Ping", Collector::new());
        routes.on_block_drained(drains.clone());
        let router = LogRouter::new(
            ContractSet::new(
                vec![StaticContract::new("Vault", VAULT_ADDR, vault_interface())],
                vec![],
            ),
            routes,
            Arc::new(NameDecoder),
            FailurePolicy::Fatal,
        );
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source,
            router,
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        // Crossing into 101 drains 100; jumping 101 -> 103 drains 102; the
        // window end drains 103.
        assert_eq!(drains.0.lock().unwrap().clone(), vec![100, 102, 103]);
    }

    // ─── Live phase ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn live_heights_run_one_at_a_time_and_cover_gaps() {
        let source = ScriptedSource::new(
            vec![100],
            vec![
                vault_log(101, 0),
                vault_log(102, 0),
                vault_log(103, 0),
                vault_log(104, 1),
            ],
        )
        .script_heights(vec![Ok(101), Ok(103), Ok(104)]);
        let collector = Collector::slow(Duration::from_millis(15));
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        // Block 102 was never announced; the 103 window covers it anyway.
        assert_eq!(
            source.windows(),
            vec![(101, 101), (102, 103), (104, 104)]
        );
        assert_eq!(
            collector.seen(),
            vec![(101, 0), (102, 0), (103, 0), (104, 1)]
        );
        // Bursty notifications never overlap handler executions.
        assert_eq!(collector.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cursor().position(), (104, Cursor::DRAINED));
    }

    #[tokio::test]
    async fn stale_heights_are_skipped() {
        let source = ScriptedSource::new(vec![105], vec![vault_log(106, 0)])
            .script_heights(vec![Ok(104), Ok(105), Ok(106)]);
        let collector = Collector::new();
        let store = Arc::new(MemoryStateStore::with_cursor(
            "sync-test",
            Cursor {
                block: 105,
                log_position: Cursor::DRAINED,
            },
        ));
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source.clone(),
            router_to(collector.clone(), FailurePolicy::Fatal),
            store,
        );

        engine.run().await.unwrap();

        assert_eq!(source.windows(), vec![(106, 106)]);
        assert_eq!(collector.seen(), vec![(106, 0)]);
    }

    #[tokio::test]
    async fn subscription_fault_is_fatal() {
        let source = ScriptedSource::new(vec![100], vec![]).script_heights(vec![
            Err(SyncError::Subscription("socket closed".into())),
        ]);
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source,
            router_to(Collector::new(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Subscription(_)));
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    // ─── Failure policy ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn handler_failure_aborts_by_default() {
        let source = ScriptedSource::new(vec![105], vec![vault_log(101, 0)]);
        let store = RecordingStore::new();
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source,
            router_to(Arc::new(Failing), FailurePolicy::Fatal),
            store.clone(),
        );

        let err = engine.run().await.unwrap_err();
        assert!(err.is_fatal());
        // The failed log was never committed.
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn skip_policy_keeps_going_past_handler_failures() {
        let source = ScriptedSource::new(vec![105], vec![vault_log(101, 0)]);
        let (mut engine, _handle) = SyncEngine::new(
            config(100, 50),
            source,
            router_to(Arc::new(Failing), FailurePolicy::Skip),
            Arc::new(MemoryStateStore::new()),
        );

        engine.run().await.unwrap();

        assert_eq!(engine.metrics().handler_failures, 1);
        assert_eq!(engine.cursor().position(), (105, Cursor::DRAINED));
    }

    // ─── Shutdown ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_stops_a_live_engine() {
        let source = ScriptedSource::new(vec![100], vec![]).script_pending_heights();
        let (mut engine, handle) = SyncEngine::new(
            config(100, 50),
            source,
            router_to(Collector::new(), FailurePolicy::Fatal),
            Arc::new(MemoryStateStore::new()),
        );

        let task = tokio::spawn(async move {
            let result = engine.run().await;
            (result, engine)
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown();

        let (result, engine) = task.await.unwrap();
        result.unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
    }
}
