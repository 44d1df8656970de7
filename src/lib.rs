pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod storage;
pub mod store;

pub use error::StoreError;
pub use events::{ChangeEvent, SubscriptionId};
pub use models::{Filter, Priority, Progress, Settings, Task, Timestamp};
pub use notify::{NotificationGateway, NotifyError, Permission};
pub use scheduler::{start_scheduler, SchedulerConfig, SchedulerHandle};
pub use storage::{MemoryStorage, Storage, StorageError, TaskPersistence};
pub use store::TaskStore;

#[cfg(all(feature = "app", not(test)))]
use std::sync::Arc;

#[cfg(all(feature = "app", not(test)))]
use crate::config::DaemonConfig;
#[cfg(all(feature = "app", not(test)))]
use crate::logging::init_logging;
#[cfg(all(feature = "app", not(test)))]
use crate::notify::StdoutGateway;

/// Headless reminder daemon: loads the task list and prints reminders as they come due.
///
/// `tasks.json` is read once at startup. Tasks written by another process later are not
/// watched, and every reminder flag it records rewrites the file from this startup copy.
#[cfg(all(feature = "app", not(test)))]
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::from_env();
    let _logger = init_logging(&config.data_dir)?;

    let storage = Storage::new(config.data_dir.clone());
    storage.ensure_dirs()?;
    let store = TaskStore::open(Arc::new(storage));

    let progress = store.progress();
    let pending = store.query(Filter::Pending);
    log::info!(
        "daemon: data_dir={} tasks={} completed={} pending={}",
        config.data_dir.display(),
        progress.total,
        progress.completed,
        pending.len()
    );
    println!(
        "todo-reminder: {} of {} tasks done ({}%), watching {} pending",
        progress.completed,
        progress.total,
        progress.percent(),
        pending.len()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let handle = start_scheduler(store, Arc::new(StdoutGateway), config.scheduler);
        let stopped = tokio::signal::ctrl_c().await;
        handle.shutdown();
        if let Err(err) = stopped {
            log::error!("daemon: failed to listen for shutdown signal: {err}");
        }
        log::info!("daemon: exiting");
    });
    Ok(())
}
