use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use crate::{DESKTOP_LOG_MAX_BYTES, LOG_DIR_NAME};

static DESKTOP_LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static DESKTOP_LOG_WRITE_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn resolve_desktop_log_path(data_dir: &Path, log_file_name: &str) -> PathBuf {
    data_dir.join(LOG_DIR_NAME).join(log_file_name)
}

/// Enables file logging. Lines logged before this call only reach stderr.
pub(crate) fn init_desktop_log_file(log_path: PathBuf) -> Result<(), String> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }
    DESKTOP_LOG_PATH
        .set(log_path)
        .map_err(|path| format!("desktop log already initialized at {}", path.display()))
}

fn format_log_line(category: &str, message: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{timestamp}] [{category}] {message}")
}

fn rotate_if_needed(log_path: &Path, max_bytes: u64) -> std::io::Result<()> {
    let size = match fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    };
    if size < max_bytes {
        return Ok(());
    }

    let mut rotated = log_path.as_os_str().to_owned();
    rotated.push(".1");
    fs::rename(log_path, PathBuf::from(rotated))
}

fn append_line_to_file(log_path: &Path, line: &str, max_bytes: u64) -> std::io::Result<()> {
    rotate_if_needed(log_path, max_bytes)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{line}")
}

fn append_log(category: &str, message: &str) {
    let line = format_log_line(category, message);
    eprintln!("{line}");

    let Some(log_path) = DESKTOP_LOG_PATH.get() else {
        return;
    };
    let _guard = DESKTOP_LOG_WRITE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(error) = append_line_to_file(log_path, &line, DESKTOP_LOG_MAX_BYTES) {
        eprintln!(
            "failed to write desktop log {}: {}",
            log_path.display(),
            error
        );
    }
}

pub(crate) fn append_desktop_log(message: &str) {
    append_log("desktop", message);
}

pub(crate) fn append_startup_log(message: &str) {
    append_log("startup", message);
}

pub(crate) fn append_bridge_log(message: &str) {
    append_log("bridge", message);
}

pub(crate) fn append_backup_log(message: &str) {
    append_log("backup", message);
}

pub(crate) fn append_shutdown_log(message: &str) {
    append_log("shutdown", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_log_line_includes_category_and_message() {
        let line = format_log_line("backup", "saved 3 entries");
        assert!(line.starts_with('['));
        assert!(line.ends_with("[backup] saved 3 entries"));
    }

    #[test]
    fn resolve_desktop_log_path_places_log_under_logs_dir() {
        let path = resolve_desktop_log_path(Path::new("/tmp/app/data"), "desktop.log");
        assert_eq!(path, PathBuf::from("/tmp/app/data/logs/desktop.log"));
    }

    #[test]
    fn append_line_to_file_rotates_when_limit_is_reached() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let log_path = dir.path().join("desktop.log");

        append_line_to_file(&log_path, "first line", 8).expect("write first line");
        append_line_to_file(&log_path, "second line", 8).expect("write second line");

        let rotated = fs::read_to_string(dir.path().join("desktop.log.1")).expect("read rotated");
        let current = fs::read_to_string(&log_path).expect("read current");
        assert_eq!(rotated, "first line\n");
        assert_eq!(current, "second line\n");
    }

    #[test]
    fn append_line_to_file_appends_below_limit() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let log_path = dir.path().join("desktop.log");

        append_line_to_file(&log_path, "a", 1024).expect("write a");
        append_line_to_file(&log_path, "b", 1024).expect("write b");

        assert_eq!(fs::read_to_string(&log_path).expect("read log"), "a\nb\n");
        assert!(!dir.path().join("desktop.log.1").exists());
    }
}
