use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{SettingsFile, TasksFile};

pub const SCHEMA_VERSION: u32 = 1;

const TASKS_FILE: &str = "tasks.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable home of the task collection and the user settings.
///
/// Each slot is written as a whole snapshot. `load_*` returns `Ok(None)` when
/// the slot has never been written.
pub trait TaskPersistence: Send + Sync {
    fn load_tasks(&self) -> Result<Option<TasksFile>, StorageError>;
    fn save_tasks(&self, data: &TasksFile) -> Result<(), StorageError>;
    fn load_settings(&self) -> Result<Option<SettingsFile>, StorageError>;
    fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError>;
}

/// JSON files under a single data directory.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<Option<T>, StorageError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(serde_json::from_str(&buf)?))
    }

    // Readers only ever see the previous or the next full snapshot.
    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl TaskPersistence for Storage {
    fn load_tasks(&self) -> Result<Option<TasksFile>, StorageError> {
        self.load_json(self.root.join(TASKS_FILE))
    }

    fn save_tasks(&self, data: &TasksFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(TASKS_FILE), data)
    }

    fn load_settings(&self) -> Result<Option<SettingsFile>, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(SETTINGS_FILE), data)
    }
}

/// Serialized slots kept in memory, the same shape a browser key-value store holds.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<MemorySlots>,
}

#[derive(Default)]
struct MemorySlots {
    tasks: Option<String>,
    settings: Option<String>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail with an io error until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.slots.lock().expect("storage poisoned").fail_writes = fail;
    }

    /// Number of successful writes across both slots.
    pub fn write_count(&self) -> usize {
        self.slots.lock().expect("storage poisoned").writes
    }

    pub fn raw_tasks(&self) -> Option<String> {
        self.slots.lock().expect("storage poisoned").tasks.clone()
    }

    fn write<T: Serialize>(&self, slot: Slot, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(data)?;
        let mut guard = self.slots.lock().expect("storage poisoned");
        if guard.fail_writes {
            return Err(StorageError::Io(std::io::Error::other("storage quota exceeded")));
        }
        match slot {
            Slot::Tasks => guard.tasks = Some(json),
            Slot::Settings => guard.settings = Some(json),
        }
        guard.writes += 1;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, slot: Slot) -> Result<Option<T>, StorageError> {
        let raw = {
            let guard = self.slots.lock().expect("storage poisoned");
            match slot {
                Slot::Tasks => guard.tasks.clone(),
                Slot::Settings => guard.settings.clone(),
            }
        };
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Tasks,
    Settings,
}

impl TaskPersistence for MemoryStorage {
    fn load_tasks(&self) -> Result<Option<TasksFile>, StorageError> {
        self.read(Slot::Tasks)
    }

    fn save_tasks(&self, data: &TasksFile) -> Result<(), StorageError> {
        self.write(Slot::Tasks, data)
    }

    fn load_settings(&self) -> Result<Option<SettingsFile>, StorageError> {
        self.read(Slot::Settings)
    }

    fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        self.write(Slot::Settings, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Settings, Task};

    fn sample_file() -> TasksFile {
        TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks: vec![
                Task {
                    id: "a".to_string(),
                    title: "pay rent".to_string(),
                    due_at: Some(1_700_000_000),
                    priority: Priority::High,
                    completed: false,
                    notified: true,
                    created_at: 1_699_999_000,
                },
                Task {
                    id: "b".to_string(),
                    title: "call mom".to_string(),
                    due_at: None,
                    priority: Priority::Low,
                    completed: true,
                    notified: false,
                    created_at: 1_699_999_500,
                },
            ],
        }
    }

    #[test]
    fn file_storage_returns_none_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("data"));
        storage.ensure_dirs().unwrap();
        assert!(storage.load_tasks().unwrap().is_none());
        assert!(storage.load_settings().unwrap().is_none());
    }

    #[test]
    fn file_storage_persists_snapshots_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let data = sample_file();
        storage.save_tasks(&data).unwrap();

        assert_eq!(storage.load_tasks().unwrap(), Some(data));
        assert!(dir.path().join("tasks.json").exists());
        assert!(!dir.path().join("tasks.tmp").exists());

        let settings = SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: Settings {
                theme: "dark".to_string(),
            },
        };
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings().unwrap(), Some(settings));
    }

    #[test]
    fn file_storage_uses_nullable_due_at_field() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.save_tasks(&sample_file()).unwrap();

        let raw = fs::read_to_string(dir.path().join("tasks.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["tasks"][0]["priority"], "high");
        assert!(value["tasks"][1]["due_at"].is_null());
    }

    #[test]
    fn file_storage_reports_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tasks.json"), "{not json").unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        assert!(matches!(storage.load_tasks(), Err(StorageError::Json(_))));
    }

    #[test]
    fn memory_storage_counts_writes_and_can_fail() {
        let storage = MemoryStorage::new();
        storage.save_tasks(&sample_file()).unwrap();
        assert_eq!(storage.write_count(), 1);
        assert_eq!(storage.load_tasks().unwrap(), Some(sample_file()));

        storage.set_fail_writes(true);
        assert!(matches!(
            storage.save_tasks(&TasksFile {
                schema_version: SCHEMA_VERSION,
                tasks: Vec::new(),
            }),
            Err(StorageError::Io(_))
        ));
        assert_eq!(storage.write_count(), 1);
        assert_eq!(storage.load_tasks().unwrap(), Some(sample_file()));
    }
}
