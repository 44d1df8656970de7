use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::SchedulerConfig;

pub const ENV_DATA_DIR: &str = "TODO_REMINDER_DATA_DIR";
pub const ENV_INTERVAL_SECS: &str = "TODO_REMINDER_INTERVAL_SECS";
pub const ENV_WARMUP_SECS: &str = "TODO_REMINDER_WARMUP_SECS";

const APP_DIR_NAME: &str = "todo-reminder";

/// Process-level settings for the daemon. User preferences live in `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub scheduler: SchedulerConfig,
}

impl DaemonConfig {
    #[cfg(feature = "app")]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::data_local_dir())
    }

    /// `lookup` reads one variable; `platform_dir` is the OS data directory if known.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        platform_dir: Option<PathBuf>,
    ) -> Self {
        let data_dir = lookup(ENV_DATA_DIR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                platform_dir
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR_NAME)
            });

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            interval: read_secs(&lookup, ENV_INTERVAL_SECS, defaults.interval, 1),
            warmup: read_secs(&lookup, ENV_WARMUP_SECS, defaults.warmup, 0),
        };

        Self {
            data_dir,
            scheduler,
        }
    }
}

fn read_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
    min: u64,
) -> Duration {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs >= min => Duration::from_secs(secs),
        _ => {
            log::warn!("config: ignoring {key}={raw:?}, using {}s", default.as_secs());
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_platform_dir() {
        let config = DaemonConfig::from_lookup(lookup(&[]), Some(PathBuf::from("/data")));
        assert_eq!(config.data_dir, PathBuf::from("/data/todo-reminder"));
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.scheduler.interval, Duration::from_secs(60));
        assert_eq!(config.scheduler.warmup, Duration::from_secs(2));
    }

    #[test]
    fn falls_back_to_current_dir_without_platform_dir() {
        let config = DaemonConfig::from_lookup(lookup(&[]), None);
        assert_eq!(config.data_dir, PathBuf::from("./todo-reminder"));
    }

    #[test]
    fn env_overrides_apply() {
        let config = DaemonConfig::from_lookup(
            lookup(&[
                (ENV_DATA_DIR, "/tmp/tasks"),
                (ENV_INTERVAL_SECS, "15"),
                (ENV_WARMUP_SECS, "0"),
            ]),
            Some(PathBuf::from("/data")),
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.scheduler.interval, Duration::from_secs(15));
        assert_eq!(config.scheduler.warmup, Duration::ZERO);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = DaemonConfig::from_lookup(
            lookup(&[
                (ENV_DATA_DIR, "  "),
                (ENV_INTERVAL_SECS, "0"),
                (ENV_WARMUP_SECS, "soon"),
            ]),
            Some(PathBuf::from("/data")),
        );
        assert_eq!(config.data_dir, PathBuf::from("/data/todo-reminder"));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }
}
