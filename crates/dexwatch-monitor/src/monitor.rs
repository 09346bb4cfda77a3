//! Monitor: cached snapshot plus interval-keyed polling jobs.
//!
//! Concurrency model:
//! - `initialize` fetches on the caller's task. Each job owns a task that
//!   runs its eager fetch and then its ticks, so a slow fetch delays only
//!   that job, and a caller that stops waiting on `start` leaves the job
//!   intact.
//! - The snapshot is replaced on completion, so with several jobs active the
//!   cache reflects whichever fetch completed last, not whichever started
//!   last.
//! - `stop` only ends scheduling. A fetch already in flight still replaces
//!   the snapshot and still emits `Update`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dexwatch_core::{PollInterval, Snapshot};
use dexwatch_fetch::DynFetcher;
use dexwatch_telemetry::Metrics;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::{FetchCause, MonitorEvent};
use crate::subject::{Subject, SubscriptionId};

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    /// A new job was scheduled.
    Started,
    /// A job for this interval already exists; nothing changed.
    AlreadyActive,
    /// The monitor is shut down; no job was scheduled.
    ShutDown,
}

/// A start request whose eager fetch may still be running.
#[derive(Debug)]
pub struct PendingStart {
    status: StartStatus,
    eager: Option<oneshot::Receiver<()>>,
}

impl PendingStart {
    pub fn status(&self) -> StartStatus {
        self.status
    }

    /// Wait for the eager fetch (if one was started) to be applied.
    pub async fn wait(self) -> StartStatus {
        if let Some(eager) = self.eager {
            // A closed channel means the job task is gone, e.g. runtime shutdown.
            let _ = eager.await;
        }
        self.status
    }
}

/// Handle for one polling job.
struct Job {
    /// Cancels future ticks; never aborts an in-flight fetch.
    token: CancellationToken,
}

struct Inner {
    fetcher: DynFetcher,
    snapshot: RwLock<Arc<Snapshot>>,
    jobs: Mutex<HashMap<PollInterval, Job>>,
    events: Subject<MonitorEvent>,
    /// Held across snapshot replacement and notification so subscribers see
    /// updates in the same order the cache applied them.
    publish: Mutex<()>,
    initialized: AtomicBool,
    /// Parent of every job token.
    shutdown: CancellationToken,
}

/// Monitoring context.
///
/// Cheap to clone; all clones share the same snapshot, jobs and subscribers.
/// Construct one per process (or per test) and pass it to whoever needs it.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

impl Monitor {
    /// Create an uninitialized monitor with an empty snapshot and no jobs.
    pub fn new(fetcher: DynFetcher) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                snapshot: RwLock::new(Arc::new(Snapshot::empty())),
                jobs: Mutex::new(HashMap::new()),
                events: Subject::new(),
                publish: Mutex::new(()),
                initialized: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Fetch once and announce the result as `Initial`.
    ///
    /// Runs only on the first call; later calls return immediately. On
    /// failure an `Error` event is emitted and the snapshot stays empty.
    pub async fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("Monitor already initialized");
            return;
        }
        if self.inner.refresh(FetchCause::Initial).await {
            info!("Initial snapshot fetched");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Start polling every `interval` and wait for the eager fetch.
    ///
    /// No-op if a job for this exact interval already exists. Otherwise
    /// fetches once, then ticks every period from the end of that fetch. The
    /// job is kept even if the eager fetch fails (the failure is reported as
    /// an `Error` event).
    ///
    /// Cancel-safe: the job lives on its own task from the moment it is
    /// reserved, so dropping this future only stops the wait.
    pub async fn start(&self, interval: PollInterval) -> StartStatus {
        self.begin_start(interval).wait().await
    }

    /// Reserve and spawn the job for `interval` without waiting for its
    /// eager fetch.
    pub fn begin_start(&self, interval: PollInterval) -> PendingStart {
        let token = match self.inner.reserve_job(interval) {
            Ok(token) => token,
            Err(status) => {
                debug!(%interval, ?status, "Not starting job");
                return PendingStart {
                    status,
                    eager: None,
                };
            }
        };

        let (eager_tx, eager_rx) = oneshot::channel();
        Inner::spawn_job(Arc::clone(&self.inner), interval, token, eager_tx);
        info!(%interval, "Started monitoring");

        PendingStart {
            status: StartStatus::Started,
            eager: Some(eager_rx),
        }
    }

    /// Stop scheduling the job for `interval`.
    ///
    /// Returns false (and does nothing) if no such job exists.
    pub fn stop(&self, interval: PollInterval) -> bool {
        let removed = {
            let mut jobs = self.inner.jobs.lock();
            let removed = jobs.remove(&interval);
            Metrics::active_jobs(jobs.len());
            removed
        };

        match removed {
            Some(job) => {
                job.token.cancel();
                info!(%interval, "Stopped monitoring");
                true
            }
            None => {
                debug!(%interval, "No monitoring job to stop");
                false
            }
        }
    }

    /// Current cached snapshot (empty before the first successful fetch).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.snapshot.read())
    }

    /// Intervals with an active job, ascending.
    pub fn active_intervals(&self) -> Vec<PollInterval> {
        let mut intervals: Vec<PollInterval> = self.inner.jobs.lock().keys().copied().collect();
        intervals.sort();
        intervals
    }

    pub fn is_active(&self, interval: PollInterval) -> bool {
        self.inner.jobs.lock().contains_key(&interval)
    }

    /// Register an event handler. Handlers run synchronously on the task
    /// that completed the fetch.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// The fetcher backing this monitor, for one-off fetches that bypass
    /// the cache.
    pub fn fetcher(&self) -> DynFetcher {
        Arc::clone(&self.inner.fetcher)
    }

    /// Stop every job and refuse new ones.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let mut jobs = self.inner.jobs.lock();
        let count = jobs.len();
        jobs.clear();
        Metrics::active_jobs(0);
        info!(stopped = count, "Monitor shut down");
    }
}

impl Inner {
    /// Claim the job slot for `interval` before any await point so that
    /// concurrent starts of the same interval create a single job.
    fn reserve_job(&self, interval: PollInterval) -> Result<CancellationToken, StartStatus> {
        let mut jobs = self.jobs.lock();
        if self.shutdown.is_cancelled() {
            warn!(%interval, "Monitor is shut down, not starting job");
            return Err(StartStatus::ShutDown);
        }
        if jobs.contains_key(&interval) {
            return Err(StartStatus::AlreadyActive);
        }

        let token = self.shutdown.child_token();
        jobs.insert(
            interval,
            Job {
                token: token.clone(),
            },
        );
        Metrics::active_jobs(jobs.len());
        Ok(token)
    }

    /// Run the eager fetch, then tick until cancelled.
    fn spawn_job(
        inner: Arc<Inner>,
        interval: PollInterval,
        token: CancellationToken,
        eager_done: oneshot::Sender<()>,
    ) {
        tokio::spawn(async move {
            inner.refresh(FetchCause::Start(interval)).await;
            // The starter may have stopped waiting.
            let _ = eager_done.send(());

            if token.is_cancelled() {
                info!(%interval, "Monitoring stopped before the first scheduled tick");
                return;
            }

            let period = interval.as_duration();
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                inner.refresh(FetchCause::Tick(interval)).await;
            }

            debug!(%interval, "Polling job exited");
        });
    }

    /// Fetch, replace the snapshot on success and notify subscribers.
    async fn refresh(&self, cause: FetchCause) -> bool {
        let started = Instant::now();
        let result = self.fetcher.fetch().await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(records) => {
                let snapshot = Arc::new(Snapshot::new(records));
                Metrics::fetch_completed(cause.label(), "ok", latency_ms);
                Metrics::snapshot_size(snapshot.len());
                debug!(%cause, records = snapshot.len(), latency_ms, "Snapshot replaced");

                let event = match cause {
                    FetchCause::Initial => MonitorEvent::Initial(Arc::clone(&snapshot)),
                    FetchCause::Start(_) | FetchCause::Tick(_) => {
                        MonitorEvent::Update(Arc::clone(&snapshot))
                    }
                };
                let _order = self.publish.lock();
                *self.snapshot.write() = snapshot;
                self.events.notify(&event);
                true
            }
            Err(e) => {
                Metrics::fetch_completed(cause.label(), e.kind(), latency_ms);
                warn!(%cause, error = %e, "Fetch failed, keeping previous snapshot");
                self.events.notify(&MonitorEvent::Error(e));
                false
            }
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("initialized", &self.is_initialized())
            .field("active_intervals", &self.active_intervals())
            .field("snapshot_records", &self.snapshot().len())
            .finish()
    }
}
