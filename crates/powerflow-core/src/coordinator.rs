// ── Refresh coordinator ──
//
// Owns the refresh schedule for one Home Assistant connection: fans out a
// fetch per configured entity on every tick, folds the results into a
// value snapshot plus connection status, and publishes both through the
// SnapshotStore. Reconfiguration swaps the whole configuration generation
// at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use powerflow_api::{Connection, FailureKind, StateClient};
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::flow::{self, PowerFlowState};
use crate::format::to_entity_value;
use crate::model::{
    ConnectionStatus, EntityConfig, EntityKind, EntityValue, RefreshState, ValueSnapshot,
};
use crate::source::{EntityReading, EntityStateSource};
use crate::store::SnapshotStore;
use crate::stream::SnapshotStream;

// ── SchedulerPhase ───────────────────────────────────────────────

/// Scheduler state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerPhase {
    /// No timer running (not started, not configured, or shut down).
    Idle,
    /// Timer running, waiting for the next tick.
    Scheduled,
    /// A tick is in progress.
    Refreshing,
}

// ── Tick results ─────────────────────────────────────────────────

/// Summary of one completed tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub generation: u64,
    pub status: ConnectionStatus,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(EntityKind, FailureKind)>,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The tick's snapshot was published.
    Published(TickReport),
    /// Configuration changed while the tick was running; its results were
    /// dropped.
    Discarded { generation: u64 },
}

impl TickOutcome {
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            Self::Published(report) => Some(report),
            Self::Discarded { .. } => None,
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Created idle: call
/// [`start()`](Self::start) to begin scheduled refreshes and
/// [`shutdown()`](Self::shutdown) to stop the background task.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    active: ArcSwap<Active>,
    sources: SourceFactory,
    store: SnapshotStore,
    phase: watch::Sender<SchedulerPhase>,
    scheduled: AtomicBool,
    trigger: Notify,
    tick_lock: Mutex<()>,
    scheduler: Mutex<SchedulerSlot>,
    cancel: CancellationToken,
}

/// One configuration generation and the source built for it.
struct Active {
    config: CoordinatorConfig,
    source: Arc<dyn EntityStateSource>,
    generation: u64,
}

/// How a fresh source is obtained on reconfiguration.
enum SourceFactory {
    /// Build a `StateClient` from the config's transport settings.
    Http,
    /// Keep using a caller-supplied source.
    Fixed(Arc<dyn EntityStateSource>),
}

impl SourceFactory {
    fn build(&self, config: &CoordinatorConfig) -> Result<Arc<dyn EntityStateSource>, CoreError> {
        match self {
            Self::Http => Ok(Arc::new(StateClient::new(&config.transport())?)),
            Self::Fixed(source) => Ok(Arc::clone(source)),
        }
    }
}

#[derive(Default)]
struct SchedulerSlot {
    started: bool,
    task: Option<SchedulerTask>,
}

struct SchedulerTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl SchedulerTask {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

impl Coordinator {
    /// Create a coordinator that talks to Home Assistant over HTTP.
    ///
    /// Fails only if the HTTP client cannot be built (unreadable CA file).
    /// Does not start refreshing.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let sources = SourceFactory::Http;
        let source = sources.build(&config)?;
        Ok(Self::build(config, source, sources))
    }

    /// Create a coordinator backed by a caller-supplied state source.
    pub fn with_source(config: CoordinatorConfig, source: Arc<dyn EntityStateSource>) -> Self {
        Self::build(config, Arc::clone(&source), SourceFactory::Fixed(source))
    }

    fn build(
        config: CoordinatorConfig,
        source: Arc<dyn EntityStateSource>,
        sources: SourceFactory,
    ) -> Self {
        let (phase, _) = watch::channel(SchedulerPhase::Idle);

        Self {
            inner: Arc::new(CoordinatorInner {
                active: ArcSwap::from_pointee(Active {
                    config,
                    source,
                    generation: 0,
                }),
                sources,
                store: SnapshotStore::new(),
                phase,
                scheduled: AtomicBool::new(false),
                trigger: Notify::new(),
                tick_lock: Mutex::new(()),
                scheduler: Mutex::new(SchedulerSlot::default()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Begin scheduled refreshing.
    ///
    /// With a usable configuration the scheduler fires an immediate tick
    /// and then one per refresh interval. Without one the coordinator stays
    /// [`Idle`](SchedulerPhase::Idle) until [`reconfigure`](Self::reconfigure)
    /// supplies it. Calling `start` twice is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let mut slot = self.inner.scheduler.lock().await;
        if slot.started {
            return Ok(());
        }
        slot.started = true;
        slot.task = self.spawn_scheduler();
        Ok(())
    }

    /// Replace the configuration.
    ///
    /// Stops the current schedule, resets every value to unavailable under
    /// a new generation, and restarts the schedule if the coordinator was
    /// started. A tick still running under the old generation is not
    /// published.
    pub async fn reconfigure(&self, config: CoordinatorConfig) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        let source = self.inner.sources.build(&config)?;

        let mut slot = self.inner.scheduler.lock().await;
        if let Some(task) = slot.task.take() {
            task.stop().await;
        }

        let generation = self.inner.active.load().generation + 1;
        self.inner.active.store(Arc::new(Active {
            config,
            source,
            generation,
        }));
        self.inner.store.reset(generation);
        info!(generation, "configuration replaced");

        if slot.started {
            slot.task = self.spawn_scheduler();
        } else {
            self.set_idle();
        }
        Ok(())
    }

    /// Stop the scheduler for good. Lifecycle calls made afterwards return
    /// [`CoreError::ShutDown`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut slot = self.inner.scheduler.lock().await;
        slot.started = false;
        if let Some(task) = slot.task.take() {
            task.stop().await;
        }
        self.set_idle();
        debug!("coordinator shut down");
    }

    fn spawn_scheduler(&self) -> Option<SchedulerTask> {
        let active = self.inner.active.load();
        if !active.config.is_configured() {
            info!("connection not configured, refresh schedule idle");
            self.set_idle();
            return None;
        }

        let period = active.config.refresh_interval.get();
        let cancel = self.inner.cancel.child_token();
        self.inner.scheduled.store(true, Ordering::SeqCst);
        self.inner.phase.send_replace(SchedulerPhase::Scheduled);
        info!(
            generation = active.generation,
            interval_secs = period.as_secs(),
            "refresh schedule started"
        );

        let handle = tokio::spawn(scheduler_task(
            Arc::clone(&self.inner),
            period,
            cancel.clone(),
        ));
        Some(SchedulerTask { handle, cancel })
    }

    fn set_idle(&self) {
        self.inner.scheduled.store(false, Ordering::SeqCst);
        self.inner.phase.send_replace(SchedulerPhase::Idle);
    }

    // ── Triggers ─────────────────────────────────────────────────

    /// Ask the scheduler for an immediate tick.
    ///
    /// At most one request is queued; asking again while one is pending
    /// does nothing extra. Returns `false` if no schedule is running.
    pub fn refresh_now(&self) -> bool {
        if !self.inner.scheduled.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.trigger.notify_one();
        true
    }

    /// Run one tick on the calling task and report the outcome.
    ///
    /// Waits for any tick already in progress to finish first.
    pub async fn refresh(&self) -> Result<TickOutcome, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        Ok(run_tick(&self.inner).await)
    }

    /// Probe the API root with the current connection settings.
    pub async fn check_connection(&self) -> Result<String, CoreError> {
        let active = self.inner.active.load_full();
        if !active.config.is_configured() {
            return Err(CoreError::NotConfigured {
                message: "base URL or access token is missing".into(),
            });
        }
        Ok(active.source.ping(&active.config.connection).await?)
    }

    // ── State observation ────────────────────────────────────────

    pub fn snapshot(&self) -> ValueSnapshot {
        self.inner.store.snapshot()
    }

    /// Snapshot and status as published together.
    pub fn state(&self) -> Arc<RefreshState> {
        self.inner.store.current()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.store.status()
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.inner.phase.borrow()
    }

    /// Subscribe to scheduler phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<SchedulerPhase> {
        self.inner.phase.subscribe()
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Flow state derived from the current snapshot.
    pub fn power_flow(&self) -> PowerFlowState {
        flow::derive(&self.inner.store.current().snapshot)
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.inner.active.load().config.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.active.load().generation
    }

    /// Time since the last tick that reached at least one entity.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.inner.store.data_age()
    }
}

// ── Background task ──────────────────────────────────────────────

/// Fire a tick immediately, then on every interval or manual trigger.
async fn scheduler_task(inner: Arc<CoordinatorInner>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let triggered = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => false,
            () = inner.trigger.notified() => true,
        };
        if triggered {
            ticker.reset();
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = run_tick(&inner) => {}
        }
    }
    debug!("refresh schedule stopped");
}

// ── Tick ─────────────────────────────────────────────────────────

async fn run_tick(inner: &CoordinatorInner) -> TickOutcome {
    let _guard = inner.tick_lock.lock().await;
    let active = inner.active.load_full();
    inner.phase.send_replace(SchedulerPhase::Refreshing);

    let readings = if active.config.is_configured() {
        fetch_all(
            active.source.as_ref(),
            &active.config.connection,
            &active.config.entity_configs(),
        )
        .await
    } else {
        Vec::new()
    };
    let (state, report) = aggregate(active.generation, Utc::now(), readings);

    inner.phase.send_replace(if inner.scheduled.load(Ordering::SeqCst) {
        SchedulerPhase::Scheduled
    } else {
        SchedulerPhase::Idle
    });

    if inner.active.load().generation != active.generation || !inner.store.publish(state) {
        debug!(
            generation = active.generation,
            "configuration changed during tick, results discarded"
        );
        return TickOutcome::Discarded {
            generation: active.generation,
        };
    }

    debug!(
        generation = report.generation,
        status = %report.status,
        attempted = report.attempted,
        succeeded = report.succeeded,
        "refresh tick complete"
    );
    TickOutcome::Published(report)
}

/// Fetch every entity concurrently. One failure never cancels the rest.
async fn fetch_all(
    source: &dyn EntityStateSource,
    connection: &Connection,
    entities: &[EntityConfig],
) -> Vec<EntityReading> {
    join_all(entities.iter().map(|entity| async move {
        EntityReading {
            kind: entity.kind(),
            identifier: entity.identifier().to_owned(),
            outcome: source.fetch_state(connection, entity.identifier()).await,
        }
    }))
    .await
}

/// Fold one tick's readings into the state to publish.
fn aggregate(
    generation: u64,
    now: DateTime<Utc>,
    readings: Vec<EntityReading>,
) -> (RefreshState, TickReport) {
    let unconfigured = readings
        .iter()
        .any(|r| r.outcome.as_ref().is_err_and(powerflow_api::Error::is_configuration));

    if readings.is_empty() || unconfigured {
        if unconfigured {
            warn!("connection settings rejected, treating as not configured");
        }
        let state = RefreshState {
            snapshot: ValueSnapshot::from_entries(generation, Some(now), []),
            status: ConnectionStatus::Disconnected,
        };
        let report = TickReport {
            generation,
            status: ConnectionStatus::Disconnected,
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
        };
        return (state, report);
    }

    let attempted = readings.len();
    let mut failures = Vec::new();
    let mut entries = Vec::with_capacity(attempted);

    for reading in readings {
        match reading.outcome {
            Ok(state) => {
                entries.push((
                    reading.kind,
                    to_entity_value(&state.state, reading.kind.unit_kind()),
                ));
            }
            Err(e) => {
                warn!(
                    entity = %reading.kind,
                    identifier = %reading.identifier,
                    error = %e,
                    "entity fetch failed"
                );
                failures.push((reading.kind, e.failure_kind()));
                entries.push((reading.kind, EntityValue::FetchFailed));
            }
        }
    }

    let succeeded = attempted - failures.len();
    let status = if succeeded == 0 {
        ConnectionStatus::Error
    } else {
        ConnectionStatus::Connected
    };

    let state = RefreshState {
        snapshot: ValueSnapshot::from_entries(generation, Some(now), entries),
        status,
    };
    let report = TickReport {
        generation,
        status,
        attempted,
        succeeded,
        failures,
    };
    (state, report)
}
