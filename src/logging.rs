use std::path::{Path, PathBuf};

pub const LOG_FILE_BASENAME: &str = "todo-reminder";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;

pub const ENV_LOG: &str = "TODO_REMINDER_LOG";

/// Logs sit next to tasks.json/settings.json in their own folder.
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// `TODO_REMINDER_LOG` wins over `RUST_LOG`; blank values are ignored.
pub fn resolve_log_spec(lookup: impl Fn(&str) -> Option<String>) -> String {
    // Keep dependency logs at WARN; our crate is more verbose in debug builds.
    let default_spec = if cfg!(debug_assertions) {
        "warn,todo_reminder_lib=debug"
    } else {
        "warn,todo_reminder_lib=info"
    };
    [ENV_LOG, "RUST_LOG"]
        .into_iter()
        .filter_map(lookup)
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(
    data_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    let dir = log_directory(data_dir);
    std::fs::create_dir_all(&dir)?;

    let spec = resolve_log_spec(|key| std::env::var(key).ok());
    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(&dir)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::Warn
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        dir.display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(handle)
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");
        let location = info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown>".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        log::error!(
            "logging: panic payload={payload} location={location}\nbacktrace:\n{backtrace}"
        );
        default_hook(info);
    }));
}
