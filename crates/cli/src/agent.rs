// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync agent: the long-running task set behind `tock agent`.
//!
//! The agent:
//! 1. Acquires an flock on the state directory for single instance
//! 2. Runs cleanup once at startup
//! 3. Spawns the connectivity monitor, which queues a trigger on each online edge
//! 4. Runs one sync pass per trigger: connectivity, the sync timer, or manual
//! 5. Runs cleanup on its own interval
//!
//! A pass that has started always runs to completion before shutdown is
//! handled.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tk_core::{Clock, ClockQueue, SystemClock};

use crate::cleanup::CleanupManager;
use crate::config::{db_path, lock_path, AgentConfig, Config};
use crate::connectivity::{ConnectivityMonitor, ConnectivityProbe, SharedConnectivity, TcpProbe};
use crate::error::{Error, Result};
use crate::events::{EventBus, StampedEvent, StatusEvent};
use crate::sync::{
    SyncClient, SyncOrchestrator, SyncOutcome, Transport, Trigger, WebSocketTransport,
};
use crate::{share_queue, SharedQueue};

/// Pending triggers beyond this are dropped; one queued pass covers them.
pub const TRIGGER_CHANNEL_CAPACITY: usize = 16;

/// Create the channel connecting trigger sources to the agent loop.
pub fn trigger_channel() -> (mpsc::Sender<Trigger>, mpsc::Receiver<Trigger>) {
    mpsc::channel(TRIGGER_CHANNEL_CAPACITY)
}

/// Capped exponential backoff for the sync timer.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Backoff {
            base,
            max: max.max(base),
            current: base,
        }
    }

    /// Delay until the next timer-triggered pass.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Records a failed pass and returns the new, longer delay.
    pub fn fail(&mut self) -> Duration {
        self.current = std::cmp::min(self.current.saturating_mul(2), self.max);
        self.current
    }

    /// Back to the base interval.
    pub fn reset(&mut self) -> Duration {
        self.current = self.base;
        self.current
    }
}

/// Timing knobs for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub sync_interval: Duration,
    pub max_backoff: Duration,
    pub cleanup_interval: Duration,
    pub retention_days: u32,
}

impl From<&AgentConfig> for AgentSettings {
    fn from(config: &AgentConfig) -> Self {
        AgentSettings {
            sync_interval: config.sync_interval(),
            max_backoff: config.max_backoff(),
            cleanup_interval: config.cleanup_interval(),
            retention_days: config.retention_days,
        }
    }
}

/// The agent's tasks, wired but not yet running.
pub struct Agent<T: Transport> {
    orchestrator: Arc<SyncOrchestrator<T>>,
    cleanup: CleanupManager,
    monitor: ConnectivityMonitor,
    trigger_rx: mpsc::Receiver<Trigger>,
    settings: AgentSettings,
}

impl<T: Transport + 'static> Agent<T> {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator<T>>,
        cleanup: CleanupManager,
        monitor: ConnectivityMonitor,
        trigger_rx: mpsc::Receiver<Trigger>,
        settings: AgentSettings,
    ) -> Self {
        Agent {
            orchestrator,
            cleanup,
            monitor,
            trigger_rx,
            settings,
        }
    }

    /// Runs until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let Agent {
            orchestrator,
            cleanup,
            monitor,
            mut trigger_rx,
            settings,
        } = self;

        run_cleanup(&cleanup, settings.retention_days).await;

        let monitor_task = tokio::spawn(monitor.run(cancel.child_token()));

        let mut backoff = Backoff::new(settings.sync_interval, settings.max_backoff);
        let sync_timer = tokio::time::sleep(backoff.current());
        tokio::pin!(sync_timer);

        let mut cleanup_timer = tokio::time::interval_at(
            Instant::now() + settings.cleanup_interval,
            settings.cleanup_interval,
        );
        cleanup_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            sync_interval_secs = settings.sync_interval.as_secs(),
            retention_days = settings.retention_days,
            "sync agent started"
        );

        loop {
            let trigger = tokio::select! {
                _ = cancel.cancelled() => break,
                Some(trigger) = trigger_rx.recv() => trigger,
                _ = &mut sync_timer => Trigger::Timer,
                _ = cleanup_timer.tick() => {
                    run_cleanup(&cleanup, settings.retention_days).await;
                    continue;
                }
            };

            let delay = match orchestrator.sync_pass(trigger).await {
                Ok(SyncOutcome::TransportFailed { .. }) => backoff.fail(),
                Ok(SyncOutcome::Skipped { reason }) => {
                    tracing::debug!(
                        trigger = trigger.as_str(),
                        reason = reason.as_str(),
                        "sync pass skipped"
                    );
                    // A skip caused by another pass says nothing about the endpoint.
                    backoff.current()
                }
                Ok(SyncOutcome::Completed(_)) => backoff.reset(),
                Err(e) => {
                    tracing::error!(error = %e, "sync pass failed on local storage");
                    backoff.fail()
                }
            };
            sync_timer.as_mut().reset(Instant::now() + delay);
        }

        if let Err(e) = monitor_task.await {
            tracing::warn!(error = %e, "connectivity monitor task failed");
        }
        tracing::info!("sync agent stopped");
        Ok(())
    }
}

async fn run_cleanup(cleanup: &CleanupManager, retention_days: u32) {
    if let Err(e) = cleanup.cleanup(retention_days).await {
        tracing::warn!(error = %e, "cleanup failed");
    }
}

/// Forwards status events to the log, and to stdout as JSON lines when
/// `json` is set. Stops when `cancel` fires.
pub fn spawn_event_printer(
    events: &EventBus,
    json: bool,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => return,
                received = rx.recv() => received,
            };
            match received {
                Ok(stamped) => {
                    log_event(&stamped);
                    if json {
                        match serde_json::to_string(&stamped) {
                            Ok(line) => println!("{}", line),
                            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "status event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
}

fn log_event(stamped: &StampedEvent) {
    match &stamped.event {
        StatusEvent::RecordStalled {
            record_id,
            attempts,
            ..
        } => {
            tracing::warn!(record_id = %record_id, attempts, "record stalled");
        }
        StatusEvent::SyncError { message, .. } => {
            tracing::debug!(error = %message, "sync error event");
        }
        event => tracing::debug!(event = event.name(), "status event"),
    }
}

/// Acquire the exclusive lock that marks a sync owner for `state_dir`.
///
/// Held by the agent for its lifetime and by `tock sync` for one pass.
pub fn acquire_lock(lock_path: &Path) -> Result<File> {
    use fs2::FileExt;

    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;

    // Try to acquire exclusive lock (non-blocking)
    file.try_lock_exclusive().map_err(|_| {
        let dir = lock_path.parent().unwrap_or(lock_path);
        Error::AgentRunning(dir.display().to_string())
    })?;

    Ok(file)
}

/// True if another process holds the sync lock for `state_dir`.
pub fn is_agent_running(state_dir: &Path) -> bool {
    use fs2::FileExt;

    let path = lock_path(state_dir);
    let Ok(file) = OpenOptions::new().read(true).write(true).open(&path) else {
        return false;
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = file.unlock();
            false
        }
        Err(_) => true,
    }
}

/// Wire an orchestrator against the configured remote endpoint.
pub fn build_orchestrator(
    config: &Config,
    queue: SharedQueue,
    connectivity: Arc<SharedConnectivity>,
    events: EventBus,
    clock: Arc<dyn Clock>,
) -> SyncOrchestrator<WebSocketTransport> {
    SyncOrchestrator::new(
        queue,
        SyncClient::new(config.remote.sync_config()),
        config.session(),
        connectivity,
        events,
        clock,
    )
    .with_escalation_threshold(config.agent.escalate_after_attempts)
}

/// Run the agent in the foreground until Ctrl-C.
pub fn run_agent(state_dir: &Path, config: &Config, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Runtime(format!("tokio: {}", e)))?;

    rt.block_on(run_agent_async(state_dir, config, json))
}

async fn run_agent_async(state_dir: &Path, config: &Config, json: bool) -> Result<()> {
    config.remote.validate_url()?;
    let _lock = acquire_lock(&lock_path(state_dir))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let events = EventBus::new(Arc::clone(&clock));
    let queue = share_queue(ClockQueue::open(&db_path(state_dir))?);
    let connectivity = Arc::new(SharedConnectivity::new());

    let orchestrator = Arc::new(build_orchestrator(
        config,
        Arc::clone(&queue),
        Arc::clone(&connectivity),
        events.clone(),
        Arc::clone(&clock),
    ));

    let probe: Box<dyn ConnectivityProbe> = match config.probe_target() {
        Some(target) => Box::new(TcpProbe::new(target, config.remote.connect_timeout())),
        None => {
            return Err(Error::InvalidRemoteUrl(config.remote.url.clone()));
        }
    };

    let (trigger_tx, trigger_rx) = trigger_channel();
    let monitor = ConnectivityMonitor::new(
        probe,
        config.agent.probe_interval(),
        Arc::clone(&connectivity),
        events.clone(),
        trigger_tx,
    );
    let cleanup = CleanupManager::new(Arc::clone(&queue), Arc::clone(&clock), events.clone());

    let cancel = CancellationToken::new();
    let printer = spawn_event_printer(&events, json, cancel.clone());

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping");
                ctrl_c_cancel.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for interrupt"),
        }
    });

    let agent = Agent::new(
        orchestrator,
        cleanup,
        monitor,
        trigger_rx,
        AgentSettings::from(&config.agent),
    );
    let result = agent.run(cancel.clone()).await;

    cancel.cancel();
    let _ = printer.await;
    result
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
