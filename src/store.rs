use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::error::StoreError;
use crate::events::{ChangeEvent, Observers, SubscriptionId, EVENT_STATE_UPDATED};
use crate::models::{
    Filter, Priority, Progress, Settings, SettingsFile, Task, TasksFile, Timestamp, THEME_DARK,
    THEME_LIGHT,
};
use crate::storage::{StorageError, TaskPersistence, SCHEMA_VERSION};

/// The single owner of the task collection.
///
/// Cloning yields another handle to the same store. Every successful mutation
/// writes one full snapshot and then emits one [`ChangeEvent`], in that order.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<StoreData>>,
    persistence: Arc<dyn TaskPersistence>,
    observers: Arc<Observers>,
}

#[derive(Debug)]
struct StoreData {
    tasks: Vec<Task>,
    settings: Settings,
    filter: Filter,
}

impl TaskStore {
    pub fn new(
        tasks: Vec<Task>,
        settings: Settings,
        persistence: Arc<dyn TaskPersistence>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreData {
                tasks: dedupe_ids(tasks),
                settings,
                filter: Filter::default(),
            })),
            persistence,
            observers: Arc::new(Observers::default()),
        }
    }

    /// Loads both slots. Missing or unreadable data starts the session empty.
    pub fn open(persistence: Arc<dyn TaskPersistence>) -> Self {
        let tasks = match persistence.load_tasks() {
            Ok(data) => data.map(|file| file.tasks).unwrap_or_default(),
            Err(err) => {
                log::warn!("store: failed to load tasks, starting empty: {err}");
                Vec::new()
            }
        };
        let settings = match persistence.load_settings() {
            Ok(data) => data.map(|file| file.settings).unwrap_or_default(),
            Err(err) => {
                log::warn!("store: failed to load settings, using defaults: {err}");
                Settings::default()
            }
        };
        log::info!("store: opened tasks={} theme={}", tasks.len(), settings.theme);
        Self::new(tasks, settings, persistence)
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(Arc::new(observer))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn add(
        &self,
        title: &str,
        due_at: Option<Timestamp>,
        priority: Option<Priority>,
    ) -> Result<Task, StoreError> {
        let title = validate_title(title)?;
        let mut guard = self.lock();
        let task = Task {
            id: new_task_id(&guard.tasks),
            title,
            due_at,
            priority: priority.unwrap_or_default(),
            completed: false,
            notified: false,
            created_at: Utc::now().timestamp(),
        };
        guard.tasks.push(task.clone());
        log::debug!("store: add id={} due_at={:?}", task.id, task.due_at);
        self.commit_tasks(guard)?;
        Ok(task)
    }

    /// A blank title leaves the task untouched but still refreshes observers
    /// so an inline editor can fall back to the stored title.
    pub fn edit(&self, id: &str, new_title: &str) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let index = find_index(&guard.tasks, id)?;
        let title = match validate_title(new_title) {
            Ok(title) => title,
            Err(err) => {
                self.refresh(guard);
                return Err(err);
            }
        };
        guard.tasks[index].title = title;
        self.commit_tasks(guard)
    }

    /// Changing the deadline does not re-arm a reminder that already fired.
    pub fn set_due(&self, id: &str, due_at: Option<Timestamp>) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let index = find_index(&guard.tasks, id)?;
        guard.tasks[index].due_at = due_at;
        self.commit_tasks(guard)
    }

    pub fn toggle_completed(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.lock();
        let index = find_index(&guard.tasks, id)?;
        let task = &mut guard.tasks[index];
        task.completed = !task.completed;
        let completed = task.completed;
        self.commit_tasks(guard)?;
        Ok(completed)
    }

    pub fn remove(&self, id: &str) -> Result<Task, StoreError> {
        let mut guard = self.lock();
        let index = find_index(&guard.tasks, id)?;
        let removed = guard.tasks.remove(index);
        log::debug!("store: remove id={id}");
        self.commit_tasks(guard)?;
        Ok(removed)
    }

    /// Returns `true` when the flag flipped. An already notified task is left
    /// alone: no write, no event.
    pub fn mark_notified(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.lock();
        let index = find_index(&guard.tasks, id)?;
        if guard.tasks[index].notified {
            return Ok(false);
        }
        guard.tasks[index].notified = true;
        self.commit_tasks(guard)?;
        Ok(true)
    }

    pub fn query(&self, filter: Filter) -> Vec<Task> {
        let guard = self.lock();
        view(&guard.tasks, filter)
    }

    /// Current view under the filter last chosen with [`TaskStore::set_filter`].
    pub fn current_view(&self) -> Vec<Task> {
        let guard = self.lock();
        view(&guard.tasks, guard.filter)
    }

    pub fn filter(&self) -> Filter {
        self.lock().filter
    }

    /// View state only; nothing is written.
    pub fn set_filter(&self, filter: Filter) {
        let mut guard = self.lock();
        guard.filter = filter;
        self.refresh(guard);
    }

    /// Fresh copy of the task if it still wants a reminder at `now`.
    pub fn due_task(&self, id: &str, now: Timestamp) -> Option<Task> {
        self.lock()
            .tasks
            .iter()
            .find(|task| task.id == id && task.is_due(now))
            .cloned()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Insertion-ordered copy of the whole collection.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn tasks_file(&self) -> TasksFile {
        tasks_file(&self.lock().tasks)
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.lock().tasks)
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn set_theme(&self, theme: &str) -> Result<Settings, StoreError> {
        let theme = theme.trim();
        if theme != THEME_LIGHT && theme != THEME_DARK {
            return Err(StoreError::UnknownTheme(theme.to_string()));
        }
        let mut guard = self.lock();
        guard.settings.theme = theme.to_string();
        let settings = guard.settings.clone();
        self.commit_settings(guard)?;
        Ok(settings)
    }

    pub fn toggle_theme(&self) -> Result<Settings, StoreError> {
        let next = if self.settings().theme == THEME_DARK {
            THEME_LIGHT
        } else {
            THEME_DARK
        };
        self.set_theme(next)
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.inner.lock().expect("state poisoned")
    }

    // The guard is released before observers run so they may read the store.
    fn commit_tasks(&self, guard: MutexGuard<'_, StoreData>) -> Result<(), StoreError> {
        let saved = self.persistence.save_tasks(&tasks_file(&guard.tasks));
        self.finish(guard, saved)
    }

    fn commit_settings(&self, guard: MutexGuard<'_, StoreData>) -> Result<(), StoreError> {
        let saved = self.persistence.save_settings(&SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: guard.settings.clone(),
        });
        self.finish(guard, saved)
    }

    fn finish(
        &self,
        guard: MutexGuard<'_, StoreData>,
        saved: Result<(), StorageError>,
    ) -> Result<(), StoreError> {
        let warning = saved.as_ref().err().map(|err| err.to_string());
        let event = change_event(&guard, warning);
        drop(guard);
        self.observers.emit(&event);
        saved.map_err(|err| {
            log::warn!("store: persist failed, keeping in-memory state: {err}");
            StoreError::StorageFailure(err)
        })
    }

    fn refresh(&self, guard: MutexGuard<'_, StoreData>) {
        let event = change_event(&guard, None);
        drop(guard);
        self.observers.emit(&event);
    }
}

/// Dated tasks first, earliest deadline first; undated tasks keep insertion order.
pub fn view(tasks: &[Task], filter: Filter) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect();
    // `sort_by` is stable, which keeps ties in insertion order.
    out.sort_by(|a, b| compare_due(a.due_at, b.due_at));
    out
}

fn compare_due(a: Option<Timestamp>, b: Option<Timestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn validate_title(title: &str) -> Result<String, StoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn find_index(tasks: &[Task], id: &str) -> Result<usize, StoreError> {
    tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

fn new_task_id(existing: &[Task]) -> String {
    loop {
        let id = uuid::Uuid::new_v4().to_string();
        if existing.iter().all(|task| task.id != id) {
            return id;
        }
    }
}

fn dedupe_ids(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            let fresh = seen.insert(task.id.clone());
            if !fresh {
                log::warn!("store: dropping duplicate task id={}", task.id);
            }
            fresh
        })
        .collect()
}

fn tasks_file(tasks: &[Task]) -> TasksFile {
    TasksFile {
        schema_version: SCHEMA_VERSION,
        tasks: tasks.to_vec(),
    }
}

fn change_event(data: &StoreData, storage_warning: Option<String>) -> ChangeEvent {
    ChangeEvent {
        name: EVENT_STATE_UPDATED,
        filter: data.filter,
        tasks: view(&data.tasks, data.filter),
        progress: Progress::of(&data.tasks),
        theme: data.settings.theme.clone(),
        storage_warning,
    }
}
