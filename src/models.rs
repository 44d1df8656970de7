use serde::{Deserialize, Serialize};

pub type Timestamp = i64;

pub const THEME_LIGHT: &str = "light";
pub const THEME_DARK: &str = "dark";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub due_at: Option<Timestamp>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notified: bool,
    #[serde(default)]
    pub created_at: Timestamp,
}

impl Task {
    /// A task is due once its deadline has arrived and it still wants a reminder.
    pub fn is_due(&self, now: Timestamp) -> bool {
        match self.due_at {
            Some(due_at) => !self.completed && !self.notified && due_at <= now,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|task| task.completed).count(),
            total: tasks.len(),
        }
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    THEME_LIGHT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TasksFile {
    pub schema_version: u32,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(completed: bool, notified: bool, due_at: Option<Timestamp>) -> Task {
        Task {
            id: "t1".to_string(),
            title: "water plants".to_string(),
            due_at,
            priority: Priority::Medium,
            completed,
            notified,
            created_at: 1,
        }
    }

    #[test]
    fn settings_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.theme, "light");
    }

    #[test]
    fn task_serde_applies_defaults_for_missing_fields() {
        let json = r#"{ "id": "t1", "title": "task", "due_at": null }"#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert!(!task.notified);
        assert_eq!(task.created_at, 0);
    }

    #[test]
    fn priority_uses_snake_case_names() {
        let value = serde_json::to_value(Priority::High).expect("serialize priority");
        assert_eq!(value, serde_json::json!("high"));
        let back: Priority = serde_json::from_value(serde_json::json!("low")).unwrap();
        assert_eq!(back, Priority::Low);
    }

    #[test]
    fn settings_serde_fills_missing_theme() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.theme, "light");
    }

    #[test]
    fn is_due_requires_deadline_reached_and_unflagged() {
        assert!(task(false, false, Some(10)).is_due(10));
        assert!(task(false, false, Some(5)).is_due(10));
        assert!(!task(false, false, Some(11)).is_due(10));
        assert!(!task(true, false, Some(5)).is_due(10));
        assert!(!task(false, true, Some(5)).is_due(10));
        assert!(!task(false, false, None).is_due(10));
    }

    #[test]
    fn filter_matches_completion_state() {
        let done = task(true, false, None);
        let open = task(false, false, None);
        assert!(Filter::All.matches(&done) && Filter::All.matches(&open));
        assert!(Filter::Pending.matches(&open) && !Filter::Pending.matches(&done));
        assert!(Filter::Completed.matches(&done) && !Filter::Completed.matches(&open));
    }

    #[test]
    fn progress_counts_completed_over_total() {
        let tasks = vec![
            task(true, false, None),
            task(false, false, None),
            task(false, false, None),
        ];
        let progress = Progress::of(&tasks);
        assert_eq!(progress, Progress { completed: 1, total: 3 });
        assert_eq!(progress.percent(), 33);
        assert_eq!(Progress::default().percent(), 0);
    }
}
