//! Scheduler — the per-roster timer loop.
//!
//! One scheduler owns one [`RotationPolicy`]. Its timer task evaluates the
//! policy, hands rotation events to the notifier pump through a queue of
//! capacity one, and requests a checkpoint write after every rotation.
//! Between evaluations it sleeps until the next cadence boundary.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use dutybot_core::error::Result;
use dutybot_core::{NotifyChannel, ProjectConfig, RotationEvent};

use crate::notify::{SharedChannel, run_pump};
use crate::policy::RotationPolicy;
use crate::store::StateStore;

/// Capacity of the queue between the timer loop and the notifier pump.
pub const EVENT_QUEUE_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, timer not started yet.
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::ShuttingDown => "shutting down",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

struct Tasks {
    timer: JoinHandle<()>,
    pump: JoinHandle<()>,
}

struct Lifecycle {
    tasks: Option<Tasks>,
}

/// Rotation scheduler for one roster.
pub struct Scheduler {
    policy: Arc<RotationPolicy>,
    channel: SharedChannel,
    message: String,
    store: Option<Arc<dyn StateStore>>,
    shutdown_tx: watch::Sender<bool>,
    state_tx: watch::Sender<SchedulerState>,
    lifecycle: Mutex<Lifecycle>,
}

impl Scheduler {
    /// Create an idle scheduler.
    ///
    /// With a store, the last checkpoint of the roster is restored right
    /// away; a missing or unusable checkpoint means starting from scratch.
    pub fn new(
        policy: RotationPolicy,
        message: &str,
        channel: Arc<dyn NotifyChannel>,
        store: Option<Arc<dyn StateStore>>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        let scheduler = Self {
            policy: Arc::new(policy),
            channel: SharedChannel::new(channel),
            message: message.to_string(),
            store,
            shutdown_tx,
            state_tx,
            lifecycle: Mutex::new(Lifecycle { tasks: None }),
        };
        scheduler.restore();
        scheduler
    }

    /// Build from a project section. The store is only used when the project persists.
    pub fn from_config(
        config: &ProjectConfig,
        policy: RotationPolicy,
        channel: Arc<dyn NotifyChannel>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let store = if config.persist { Some(store) } else { None };
        Self::new(policy, &config.message, channel, store)
    }

    fn restore(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let name = self.policy.roster_id();

        match store.get(name) {
            Ok(checkpoint) => match self.policy.restore_state(&checkpoint) {
                Ok(()) => tracing::info!(
                    "💾 [{}] restored state: current person {}, last change at {}",
                    name,
                    self.policy.current_holder().as_deref().unwrap_or("<none>"),
                    checkpoint.last_change
                ),
                Err(e) => tracing::warn!("⚠️ [{}] could not restore state: {e}", name),
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("⚠️ [{}] no saved state, starting from the first person", name)
            }
            Err(e) => tracing::warn!(
                "⚠️ [{}] could not load state, starting from the first person: {e}",
                name
            ),
        }
    }

    /// Spawn the timer loop and the notifier pump.
    ///
    /// The first evaluation happens immediately. Starting twice, or after
    /// shutdown, does nothing.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.state() != SchedulerState::Idle {
            tracing::warn!(
                "[{}] scheduler is {}, not starting",
                self.policy.roster_id(),
                self.state()
            );
            return;
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let pump = tokio::spawn(run_pump(self.message.clone(), events_rx, self.channel.clone()));
        let timer = tokio::spawn(timer_loop(
            self.policy.clone(),
            events_tx,
            self.store.clone(),
            self.shutdown_tx.subscribe(),
        ));

        lifecycle.tasks = Some(Tasks { timer, pump });
        self.state_tx.send_replace(SchedulerState::Running);
        tracing::info!(
            "📅 [{}] scheduler started: {} people, {}",
            self.policy.roster_id(),
            self.policy.roster().len(),
            self.policy.cadence()
        );
    }

    /// Replace the notify channel. Affects events delivered from now on.
    pub fn set_notify_channel(&self, channel: Arc<dyn NotifyChannel>) {
        self.channel.replace(channel);
    }

    pub fn policy(&self) -> &Arc<RotationPolicy> {
        &self.policy
    }

    pub fn roster_id(&self) -> &str {
        self.policy.roster_id()
    }

    pub fn current_holder(&self) -> Option<String> {
        self.policy.current_holder()
    }

    pub fn last_change_time(&self) -> DateTime<Utc> {
        self.policy.last_change_time()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// Stop the timer, deliver what is already queued, then shut the channel down.
    ///
    /// Safe to call concurrently and repeatedly: every caller returns after
    /// the shutdown is complete, and the channel is shut down exactly once.
    pub async fn shutdown(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.state() == SchedulerState::Stopped {
            return Ok(());
        }

        let name = self.policy.roster_id();
        tracing::info!("[{}] triggering shutdown", name);
        self.state_tx.send_replace(SchedulerState::ShuttingDown);
        self.shutdown_tx.send_replace(true);

        if let Some(Tasks { timer, pump }) = lifecycle.tasks.take() {
            // The timer owns the event sender; once it exits the pump drains and stops.
            if let Err(e) = timer.await {
                tracing::error!("[{}] timer task failed: {e}", name);
            }
            if let Err(e) = pump.await {
                tracing::error!("[{}] notifier task failed: {e}", name);
            }
        }

        let channel = self.channel.get();
        let result = channel.shutdown().await;
        if let Err(e) = &result {
            tracing::error!("[{}] could not shut down {} channel: {e}", name, channel.name());
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        tracing::info!("[{}] shutdown finished", name);
        result
    }
}

async fn timer_loop(
    policy: Arc<RotationPolicy>,
    events: mpsc::Sender<RotationEvent>,
    store: Option<Arc<dyn StateStore>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = policy.roster_id().to_string();

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        let now = Utc::now();
        if policy.should_advance(now) {
            match policy.rotate(now) {
                Ok(event) => {
                    if events.send(event).await.is_err() {
                        tracing::warn!("[{}] notifier has stopped, update dropped", name);
                    }
                }
                Err(e) => tracing::error!("[{}] could not choose next person: {e}", name),
            }

            if let Some(store) = &store {
                if let Err(e) = store.put(&policy.checkpoint()) {
                    tracing::error!("[{}] could not save state: {e}", name);
                }
            }
        } else {
            tracing::debug!("[{}] timer triggered, change of person is not needed", name);
        }

        let wait = policy.time_until_next_evaluation(Utc::now());
        tracing::debug!("⏰ [{}] next evaluation in {:?}", name, wait);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
    }

    tracing::debug!("[{}] timer loop finished", name);
}
