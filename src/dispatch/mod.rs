use crate::config::{read_store, SharedStore};
use crate::constants::DEFAULT_SCAN_INTERVAL_SECS;
use crate::matcher::{find_match, MatchSource};
use crate::platform::WindowSnapshotProvider;
use crate::presence::PresenceState;
use crate::safe_lock;
use crate::twitch::RemoteStateUpdater;
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct ControllerConfig {
    pub scan_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
        }
    }
}

/// Outcome of the latest scan cycle, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The controller is not scanning.
    Idle,
    /// Nothing on screen or in presence matches a rule.
    NoMatch,
    /// The matched category was already dispatched.
    AlreadyCurrent { name: String, category_id: String },
    /// The category was changed.
    Switched {
        name: String,
        category_id: String,
        source: MatchSource,
    },
    /// The category change was attempted and failed. Not retried while the
    /// same rule keeps matching.
    SwitchFailed {
        name: String,
        category_id: String,
        reason: String,
    },
    /// A previous cycle was still in flight.
    Skipped,
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStatus::Idle => write!(f, "Automatic switching stopped"),
            DispatchStatus::NoMatch => {
                write!(f, "No game window detected and no matching presence")
            }
            DispatchStatus::AlreadyCurrent { name, .. } => {
                write!(f, "Detected {name}, category unchanged")
            }
            DispatchStatus::Switched {
                name, category_id, ..
            } => write!(f, "Switched category to {name} ({category_id})"),
            DispatchStatus::SwitchFailed { name, reason, .. } => {
                write!(f, "Failed to switch category to {name}: {reason}")
            }
            DispatchStatus::Skipped => write!(f, "Previous scan still running, skipped"),
        }
    }
}

/// Debounce state: the category last sent to the remote, successful or not.
#[derive(Debug, Default)]
struct DispatchState {
    last_dispatched_category_id: Option<String>,
}

/// One scan-match-dispatch pass and everything it needs.
struct ScanCycle {
    windows: Arc<dyn WindowSnapshotProvider>,
    rules: SharedStore,
    presence: PresenceState,
    updater: Arc<dyn RemoteStateUpdater>,
    // Held for the whole cycle, so cycles never overlap
    state: AsyncMutex<DispatchState>,
    status: watch::Sender<DispatchStatus>,
    // Bumped by every start; a loop only reports Idle while it is the latest
    generation: AtomicU64,
}

impl ScanCycle {
    async fn run(&self) -> DispatchStatus {
        let Ok(state) = self.state.try_lock() else {
            debug!("Previous scan still in flight, skipping tick");
            return DispatchStatus::Skipped;
        };
        self.run_locked(state).await
    }

    async fn run_locked(&self, mut state: AsyncMutexGuard<'_, DispatchState>) -> DispatchStatus {
        let windows = self.windows.list_visible_windows();
        let rules = read_store(&self.rules).snapshot();
        let title_id = self.presence.title_id();

        let status = match find_match(&windows, &rules, title_id.as_deref()) {
            None => DispatchStatus::NoMatch,
            Some(matched)
                if state.last_dispatched_category_id.as_deref()
                    == Some(matched.rule.category_id.as_str()) =>
            {
                DispatchStatus::AlreadyCurrent {
                    name: matched.rule.name.clone(),
                    category_id: matched.rule.category_id.clone(),
                }
            }
            Some(matched) => {
                let name = matched.rule.name.clone();
                let category_id = matched.rule.category_id.clone();
                let result = self.updater.update_category(&category_id).await;
                // Advance on attempt, not on success
                state.last_dispatched_category_id = Some(category_id.clone());
                match result {
                    Ok(()) => DispatchStatus::Switched {
                        name,
                        category_id,
                        source: matched.source,
                    },
                    Err(e) => DispatchStatus::SwitchFailed {
                        name,
                        category_id,
                        reason: e.to_string(),
                    },
                }
            }
        };

        self.publish(&status);
        status
    }

    fn publish(&self, status: &DispatchStatus) {
        let changed = self.status.send_if_modified(|current| {
            if current == status {
                return false;
            }
            current.clone_from(status);
            true
        });
        match status {
            DispatchStatus::SwitchFailed { .. } => warn!("{status}"),
            DispatchStatus::Idle
            | DispatchStatus::NoMatch
            | DispatchStatus::AlreadyCurrent { .. }
            | DispatchStatus::Switched { .. }
            | DispatchStatus::Skipped => {
                if changed {
                    info!("{status}");
                } else {
                    debug!("{status}");
                }
            }
        }
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic driver: Idle until [`start`](Self::start), Running until
/// [`stop`](Self::stop).
pub struct DispatchController {
    config: ControllerConfig,
    cycle: Arc<ScanCycle>,
    running: Mutex<Option<RunningLoop>>,
}

impl DispatchController {
    pub fn new(
        windows: Arc<dyn WindowSnapshotProvider>,
        rules: SharedStore,
        presence: PresenceState,
        updater: Arc<dyn RemoteStateUpdater>,
        config: ControllerConfig,
    ) -> Self {
        let (status, _) = watch::channel(DispatchStatus::Idle);
        Self {
            config,
            cycle: Arc::new(ScanCycle {
                windows,
                rules,
                presence,
                updater,
                state: AsyncMutex::new(DispatchState::default()),
                status,
                generation: AtomicU64::new(0),
            }),
            running: Mutex::new(None),
        }
    }

    /// Start ticking. Must be called from within a tokio runtime. Returns
    /// false if already running.
    pub fn start(&self) -> bool {
        let mut running = safe_lock(&self.running, "Controller");
        if running.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let cycle = Arc::clone(&self.cycle);
        let interval = self.config.scan_interval;
        let generation = self.cycle.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut first = true;
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if first {
                    // A cycle abandoned by an earlier stop may still hold the
                    // state; wait it out instead of skipping
                    first = false;
                    let state = tokio::select! {
                        biased;
                        () = token.cancelled() => break,
                        state = cycle.state.lock() => state,
                    };
                    cycle.run_locked(state).await;
                } else {
                    cycle.run().await;
                }
                if token.is_cancelled() {
                    // A stop landed mid-cycle; don't leave its result as the
                    // status unless a newer loop has taken over
                    if cycle.generation.load(Ordering::SeqCst) == generation {
                        cycle.publish(&DispatchStatus::Idle);
                    }
                    break;
                }
            }
        });

        *running = Some(RunningLoop { cancel, handle });
        info!(
            "Automatic switching started (every {}s)",
            self.config.scan_interval.as_secs()
        );
        true
    }

    /// Stop ticking. Never waits for an in-flight remote call; that call may
    /// still finish and update the debounce state. Returns false if idle.
    pub fn stop(&self) -> bool {
        let Some(running) = safe_lock(&self.running, "Controller").take() else {
            return false;
        };
        running.cancel.cancel();
        self.cycle.publish(&DispatchStatus::Idle);
        true
    }

    /// Stop and wait (bounded) for the loop task to wind down.
    pub async fn shutdown(&self, timeout: Duration) {
        let Some(running) = safe_lock(&self.running, "Controller").take() else {
            return;
        };
        running.cancel.cancel();
        if time::timeout(timeout, running.handle).await.is_err() {
            warn!("Scan loop did not stop within {}ms", timeout.as_millis());
        }
        self.cycle.publish(&DispatchStatus::Idle);
    }

    pub fn is_running(&self) -> bool {
        safe_lock(&self.running, "Controller").is_some()
    }

    /// Run one cycle now, outside the timer. Serialized with timer cycles.
    pub async fn scan_now(&self) -> DispatchStatus {
        self.cycle.run().await
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatchStatus> {
        self.cycle.status.subscribe()
    }

    pub fn status(&self) -> DispatchStatus {
        self.cycle.status.borrow().clone()
    }

    pub async fn last_dispatched(&self) -> Option<String> {
        self.cycle.state.lock().await.last_dispatched_category_id.clone()
    }
}

impl Drop for DispatchController {
    fn drop(&mut self) {
        if let Some(running) = safe_lock(&self.running, "Controller").take() {
            running.cancel.cancel();
        }
    }
}
