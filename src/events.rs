use std::sync::{Arc, Mutex};

use crate::models::{Filter, Progress, Task};

pub const EVENT_STATE_UPDATED: &str = "state_updated";

/// What the presentation layer needs to redraw after any state change.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangeEvent {
    pub name: &'static str,
    pub filter: Filter,
    pub tasks: Vec<Task>,
    pub progress: Progress,
    pub theme: String,
    /// Set when the change could not be written to durable storage.
    pub storage_warning: Option<String>,
}

pub type SubscriptionId = u64;

type Observer = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Observers {
    inner: Mutex<ObserverList>,
}

#[derive(Default)]
struct ObserverList {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Observer)>,
}

impl Observers {
    pub(crate) fn subscribe(&self, observer: Observer) -> SubscriptionId {
        let mut guard = self.inner.lock().expect("observers poisoned");
        guard.next_id += 1;
        let id = guard.next_id;
        guard.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.inner.lock().expect("observers poisoned");
        let before = guard.entries.len();
        guard.entries.retain(|(entry_id, _)| *entry_id != id);
        guard.entries.len() != before
    }

    pub(crate) fn emit(&self, event: &ChangeEvent) {
        // Snapshot first so an observer may subscribe or unsubscribe from inside its callback.
        let observers: Vec<Observer> = {
            let guard = self.inner.lock().expect("observers poisoned");
            guard.entries.iter().map(|(_, observer)| observer.clone()).collect()
        };
        for observer in observers {
            observer(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("observers poisoned").entries.len()
    }
}
