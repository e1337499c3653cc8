//! Single-flight rebuild scheduler.
//!
//! At most one pass runs at a time. Manual requests queue behind the pass in
//! flight and then run their own. Automatic requests never wait: a burst that
//! arrives during a pass collapses into one follow-up pass, and any request
//! inside the cooldown window of the previous automatic start is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use patchdex_config::SchedulerConfig;

use crate::BoxFuture;
use crate::indexer::{IndexError, RebuildReport, RebuildRunner};

/// Who asked for a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildKind {
    /// Explicit user request; always runs.
    Manual,
    /// Filesystem or host trigger; may be throttled or coalesced.
    Auto,
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Completed(RebuildReport),
    /// The pass failed; the error has already been logged.
    Failed(String),
    /// Folded into the follow-up pass of the rebuild in flight.
    Coalesced,
    /// Dropped because an automatic pass started within the cooldown.
    Throttled,
}

#[derive(Debug, Default)]
struct SchedulerState {
    running: bool,
    pending_auto: bool,
    last_auto_start: Option<Instant>,
}

struct SchedulerInner {
    runner: Arc<dyn RebuildRunner>,
    cooldown: Duration,
    state: Mutex<SchedulerState>,
    idle: watch::Sender<bool>,
}

/// Cloneable handle; clones share one state machine.
#[derive(Clone)]
pub struct RebuildScheduler {
    inner: Arc<SchedulerInner>,
}

impl RebuildScheduler {
    pub fn new(runner: Arc<dyn RebuildRunner>, config: &SchedulerConfig) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(SchedulerInner {
                runner,
                cooldown: Duration::from_millis(config.auto_cooldown_ms),
                state: Mutex::new(SchedulerState::default()),
                idle,
            }),
        }
    }

    /// Submit a rebuild request.
    ///
    /// Failures never propagate as errors; they come back as
    /// [`RebuildOutcome::Failed`] after being logged.
    pub async fn request(&self, kind: RebuildKind) -> RebuildOutcome {
        match kind {
            RebuildKind::Manual => self.request_manual().await,
            RebuildKind::Auto => self.request_auto().await,
        }
    }

    async fn request_manual(&self) -> RebuildOutcome {
        let mut idle = self.inner.idle.subscribe();
        while !self.inner.try_begin() {
            debug!("Rebuild in flight, manual request waiting");
            // The sender lives as long as `inner`, so this only returns once idle.
            let _ = idle.wait_for(|idle| *idle).await;
        }
        self.run_detached(RebuildKind::Manual).await
    }

    async fn request_auto(&self) -> RebuildOutcome {
        {
            let mut state = self.inner.lock();
            let now = Instant::now();
            if let Some(last) = state.last_auto_start
                && now.duration_since(last) < self.inner.cooldown
            {
                debug!("Automatic rebuild throttled");
                return RebuildOutcome::Throttled;
            }
            if state.running {
                state.pending_auto = true;
                debug!("Automatic rebuild coalesced into follow-up pass");
                return RebuildOutcome::Coalesced;
            }
            state.running = true;
            state.last_auto_start = Some(now);
            self.inner.idle.send_replace(false);
        }
        self.run_detached(RebuildKind::Auto).await
    }

    /// Run a pass whose slot is already claimed on its own task, so the
    /// state machine finishes even if the requesting future is dropped.
    async fn run_detached(&self, kind: RebuildKind) -> RebuildOutcome {
        let pass = tokio::spawn(SchedulerInner::drive(Arc::clone(&self.inner), kind));
        match pass.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?kind, error = %err, "Rebuild task aborted");
                RebuildOutcome::Failed(err.to_string())
            }
        }
    }

    /// Resolve once no pass is running and none is queued.
    pub async fn wait_idle(&self) {
        let mut idle = self.inner.idle.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }
}

impl SchedulerInner {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_begin(&self) -> bool {
        let mut state = self.lock();
        if state.running {
            return false;
        }
        state.running = true;
        self.idle.send_replace(false);
        true
    }

    fn drive(inner: Arc<Self>, kind: RebuildKind) -> BoxFuture<'static, RebuildOutcome> {
        Box::pin(async move {
            let _slot = InFlight(Arc::clone(&inner));
            debug!(?kind, "Rebuild starting");
            match inner.runner.rebuild().await {
                Ok(report) => RebuildOutcome::Completed(report),
                Err(err) => {
                    log_failure(&err, kind);
                    RebuildOutcome::Failed(err.to_string())
                }
            }
        })
    }

    /// Release the in-flight slot or hand it to the coalesced follow-up.
    fn finish(self: &Arc<Self>) {
        let mut state = self.lock();
        if state.pending_auto {
            state.pending_auto = false;
            state.last_auto_start = Some(Instant::now());
            drop(state);
            info!("Running coalesced automatic rebuild");
            tokio::spawn(Self::drive(Arc::clone(self), RebuildKind::Auto));
        } else {
            state.running = false;
            self.idle.send_replace(true);
        }
    }
}

/// Holds the in-flight slot for one pass; releases it on drop, including
/// when the runner panics.
struct InFlight(Arc<SchedulerInner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.finish();
    }
}

fn log_failure(err: &IndexError, kind: RebuildKind) {
    match (err, kind) {
        (IndexError::ConfigNotFound(path), RebuildKind::Auto) => {
            debug!(path = %path.display(), "Package root missing, automatic rebuild skipped");
        }
        _ => warn!(?kind, error = %err, "Rebuild failed"),
    }
}
