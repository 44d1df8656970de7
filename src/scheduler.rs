use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::StoreError;
use crate::models::{Task, Timestamp};
use crate::notify::{NotificationGateway, Permission};
use crate::store::TaskStore;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Delay before the first scan, so tasks already overdue at startup fire promptly.
    pub warmup: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            warmup: DEFAULT_WARMUP,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    pub skipped_no_permission: bool,
}

/// Keeps the background scan alive; [`SchedulerHandle::shutdown`] stops it.
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn shutdown(self) {
        self.task.abort();
        log::info!("scheduler: stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the scan loop on the current tokio runtime.
pub fn start_scheduler<G>(
    store: TaskStore,
    gateway: Arc<G>,
    config: SchedulerConfig,
) -> SchedulerHandle
where
    G: NotificationGateway + 'static,
{
    log::info!(
        "scheduler: starting interval_secs={} warmup_secs={}",
        config.interval.as_secs(),
        config.warmup.as_secs()
    );
    let task = tokio::spawn(async move {
        let start = Instant::now();
        tokio::time::sleep(config.warmup).await;
        run_tick(&store, gateway.as_ref(), Utc::now().timestamp());

        let mut interval = tokio::time::interval_at(start + config.interval, config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            run_tick(&store, gateway.as_ref(), Utc::now().timestamp());
        }
    });
    SchedulerHandle { task }
}

/// One scan. Without permission nothing is flagged, so reminders still fire
/// once the user allows them.
pub fn run_tick<G>(store: &TaskStore, gateway: &G, now: Timestamp) -> TickReport
where
    G: NotificationGateway,
{
    let mut report = TickReport::default();
    if gateway.permission_state() != Permission::Granted {
        report.skipped_no_permission = true;
        log::debug!("scheduler: tick skipped, notifications not granted");
        return report;
    }

    for candidate in collect_due_tasks(&store.tasks(), now) {
        // A user call may have completed, removed or flagged it since the scan started.
        let Some(task) = store.due_task(&candidate.id, now) else {
            log::debug!("scheduler: no longer due id={}", candidate.id);
            continue;
        };
        let (title, body) = reminder_text(&task);
        if let Err(err) = gateway.deliver(&title, &body) {
            log::warn!("scheduler: deliver failed id={} err={err}", task.id);
            report.failed.push(task.id);
            continue;
        }
        match store.mark_notified(&task.id) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                log::debug!("scheduler: task removed during tick id={}", task.id);
            }
            Err(err) => {
                log::warn!("scheduler: mark_notified id={} err={err}", task.id);
            }
        }
        report.delivered.push(task.id);
    }

    if !report.delivered.is_empty() || !report.failed.is_empty() {
        log::info!(
            "scheduler: tick now={now} delivered={} failed={}",
            report.delivered.len(),
            report.failed.len()
        );
    }
    report
}

pub fn collect_due_tasks(tasks: &[Task], now: Timestamp) -> Vec<Task> {
    tasks.iter().filter(|task| task.is_due(now)).cloned().collect()
}

pub fn reminder_text(task: &Task) -> (String, String) {
    (
        format!("To-Do Reminder: {}", task.title),
        format!("It's time to: {}", task.title),
    )
}
