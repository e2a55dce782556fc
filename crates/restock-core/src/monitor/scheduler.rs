use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::monitor::engine::{MonitorEngine, Outcome};
use crate::monitor::observation::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Active,
    Stopping,
    Stopped,
}

impl SchedulerState {
    pub fn can_transition_to(self, target: SchedulerState) -> bool {
        matches!(
            (self, target),
            (SchedulerState::Idle, SchedulerState::Active)
                | (SchedulerState::Active, SchedulerState::Stopping)
                | (SchedulerState::Stopping, SchedulerState::Stopped)
                | (SchedulerState::Stopped, SchedulerState::Active)
        )
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Callback invoked at the top of every pass to re-read the target list,
/// so configuration edits take effect without a restart.
pub type TargetLoader = Arc<dyn Fn() -> Result<Vec<Target>, String> + Send + Sync>;

/// One target's result within a pass.
#[derive(Debug)]
pub struct PassResult {
    pub target: Target,
    pub outcome: Outcome,
}

/// Drives the engine over the configured targets.
///
/// Targets are processed strictly sequentially within a pass; per-target
/// failures are logged and never abort the pass. In continuous mode the
/// shutdown state is checked between passes, not mid-pass.
#[derive(Clone)]
pub struct Scheduler {
    engine: Arc<MonitorEngine>,
    targets: Arc<RwLock<Vec<Target>>>,
    state: Arc<RwLock<SchedulerState>>,
    config: MonitorConfig,
    target_loader: Option<TargetLoader>,
    last_pass: Arc<RwLock<Option<DateTime<Utc>>>>,
    pass_count: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(engine: Arc<MonitorEngine>, targets: Vec<Target>, config: MonitorConfig) -> Self {
        Self {
            engine,
            targets: Arc::new(RwLock::new(targets)),
            state: Arc::new(RwLock::new(SchedulerState::Idle)),
            config,
            target_loader: None,
            last_pass: Arc::new(RwLock::new(None)),
            pass_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Re-read targets through `loader` at the top of every pass.
    pub fn with_target_loader(mut self, loader: TargetLoader) -> Self {
        self.target_loader = Some(loader);
        self
    }

    pub fn engine(&self) -> &Arc<MonitorEngine> {
        &self.engine
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    pub async fn targets(&self) -> Vec<Target> {
        self.targets.read().await.clone()
    }

    pub async fn last_pass(&self) -> Option<DateTime<Utc>> {
        *self.last_pass.read().await
    }

    pub fn pass_count(&self) -> u64 {
        self.pass_count.load(Ordering::SeqCst)
    }

    /// Run a single sequential pass over all targets.
    pub async fn run_once(&self) -> Vec<PassResult> {
        if let Some(loader) = &self.target_loader {
            match loader() {
                Ok(fresh) => {
                    *self.targets.write().await = fresh;
                }
                Err(e) => {
                    // Keep the previous list; a broken config edit should not
                    // stop monitoring.
                    warn!(error = %e, "Failed to reload targets, keeping previous list");
                }
            }
        }

        let targets = self.targets.read().await.clone();
        *self.last_pass.write().await = Some(Utc::now());

        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.engine.process(&target).await;
            match &outcome {
                Outcome::Processed { available, alerted } => {
                    info!(
                        source = %target.source,
                        item = %target.item,
                        available,
                        alerted,
                        "Target processed"
                    );
                }
                Outcome::ProbeFailed(e) => {
                    warn!(source = %target.source, item = %target.item, error = %e, "Probe failed, skipping target");
                }
                Outcome::StoreFailed(e) => {
                    warn!(source = %target.source, item = %target.item, error = %e, "Store failed, transition not processed");
                }
            }
            results.push(PassResult { target, outcome });
        }

        self.pass_count.fetch_add(1, Ordering::SeqCst);
        results
    }

    /// Start the continuous loop in a background task.
    ///
    /// Passes repeat with a jittered inter-pass delay until [`stop`] is
    /// called; the state is only consulted between passes.
    ///
    /// [`stop`]: Scheduler::stop
    pub async fn start(&self) {
        {
            let mut state = self.state.write().await;
            if *state == SchedulerState::Active {
                return;
            }
            *state = SchedulerState::Active;
        }

        let target_count = self.targets.read().await.len();
        info!(targets = target_count, "Starting scheduler");

        let scheduler = self.clone();
        tokio::spawn(async move {
            loop {
                {
                    let current = *scheduler.state.read().await;
                    if current != SchedulerState::Active {
                        *scheduler.state.write().await = SchedulerState::Stopped;
                        info!("Scheduler stopped");
                        break;
                    }
                }

                scheduler.run_once().await;

                let base_ms = scheduler.config.pass_delay.as_millis() as u64;
                let jitter_range = base_ms / 7;
                let jitter = if jitter_range > 0 {
                    rand::thread_rng().gen_range(0..jitter_range * 2) as i64 - jitter_range as i64
                } else {
                    0
                };
                let sleep_ms = (base_ms as i64 + jitter).max(1) as u64;
                tokio::time::sleep(tokio::time::Duration::from_millis(sleep_ms)).await;
            }
        });
    }

    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if *state == SchedulerState::Active {
            *state = SchedulerState::Stopping;
            info!("Stopping scheduler");
        }
    }
}
