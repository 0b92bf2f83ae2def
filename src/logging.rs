//! Structured logging: console + daily rolling file.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ENV_LOG_DIR;

const APP_DIR_NAME: &str = "toko-agung-dashboard";
const LOG_FILE_PREFIX: &str = "dashboard";
const MAX_LOG_FILES: usize = 14;
const DEFAULT_FILTER: &str = "info,toko_dashboard_lib=debug";

/// Line format of the log file. The console is always human-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?} (expected text or json)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// `TOKO_LOG_DIR` when set, else the per-user data directory.
pub fn default_log_dir() -> PathBuf {
    log_dir_from(|key| std::env::var_os(key))
}

fn log_dir_from(get: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    let path_var = |key: &str| get(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(dir) = path_var(ENV_LOG_DIR) {
        return dir;
    }
    let data_home = if cfg!(windows) {
        path_var("LOCALAPPDATA")
            .or_else(|| path_var("USERPROFILE").map(|p| p.join("AppData").join("Local")))
    } else {
        path_var("XDG_DATA_HOME")
            .or_else(|| path_var("HOME").map(|p| p.join(".local").join("share")))
    };
    data_home
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("logs")
}

/// Install the global subscriber. The returned guard flushes the file writer
/// when dropped, so keep it alive until the process exits.
pub fn init(log_dir: &Path, format: LogFormat) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    prune_old_logs(log_dir, MAX_LOG_FILES);
    if let Err(e) = fs::create_dir_all(log_dir) {
        // No file logging, but the console still works.
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
        warn!(dir = %log_dir.display(), error = %e, "cannot create log directory");
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);
    match format {
        LogFormat::Text => registry.with(file_layer).init(),
        LogFormat::Json => registry.with(file_layer.json()).init(),
    }
    Some(guard)
}

/// Delete old log files in `log_dir`, keeping the `keep` most recent.
pub fn prune_old_logs(log_dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    let prefix = format!("{LOG_FILE_PREFIX}.");
    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false)
        })
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(std::time::UNIX_EPOCH);
            (entry.path(), modified)
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(keep) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("toko_logs_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: std::collections::HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn log_dir_prefers_explicit_env() {
        let dir = log_dir_from(vars(&[
            (ENV_LOG_DIR, "/srv/toko/logs"),
            ("XDG_DATA_HOME", "/data"),
        ]));
        assert_eq!(dir, PathBuf::from("/srv/toko/logs"));
    }

    #[test]
    fn log_dir_falls_back_to_data_home() {
        let dir = log_dir_from(vars(&[(ENV_LOG_DIR, ""), ("XDG_DATA_HOME", "/data"), ("LOCALAPPDATA", "/data")]));
        assert_eq!(dir, Path::new("/data").join(APP_DIR_NAME).join("logs"));

        let dir = log_dir_from(vars(&[]));
        assert_eq!(dir, Path::new(".").join(APP_DIR_NAME).join("logs"));
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn prune_keeps_newest_and_ignores_other_files() {
        let dir = temp_dir();
        let now = SystemTime::now();
        for day in 0..5u64 {
            let path = dir.join(format!("dashboard.2026-10-{:02}", 10 + day));
            fs::write(&path, "log").expect("write log");
            let file = fs::File::options()
                .write(true)
                .open(&path)
                .expect("open log");
            file.set_modified(now - Duration::from_secs(86_400 * (5 - day)))
                .expect("set mtime");
        }
        fs::write(dir.join("notes.txt"), "keep me").expect("write other");

        prune_old_logs(&dir, 2);

        let mut remaining: Vec<String> = fs::read_dir(&dir)
            .expect("read dir")
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "dashboard.2026-10-13".to_string(),
                "dashboard.2026-10-14".to_string(),
                "notes.txt".to_string()
            ]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn prune_missing_dir_is_harmless() {
        let dir = std::env::temp_dir().join(format!("toko_absent_{}", uuid::Uuid::new_v4()));
        prune_old_logs(&dir, 1);
        assert!(!dir.exists());
    }
}
