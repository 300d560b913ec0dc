use std::{path::Path, sync::Mutex, thread, time::Duration};

use serde_json::Value;
use tauri::{AppHandle, Manager};

use crate::{
    append_backup_log,
    page_script_host::{PageScripting, WebviewScriptHost},
    page_scripts::PageCall,
    user_data::{self, PersistOutcome},
    DesktopState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackupOutcome {
    Written { entries: usize },
    Unchanged,
    NothingToSave,
    /// Shutdown began while the pull was in flight; the final backup owns the
    /// file from then on.
    Superseded,
}

fn pulled_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// One pull-and-persist round trip. `pull` selects between the mailbox-aware
/// periodic pull and the direct enumeration used at shutdown.
pub(crate) fn run_backup_cycle<P>(
    page: &P,
    pull: PageCall<'_>,
    user_data_path: &Path,
    write_lock: &Mutex<()>,
) -> Result<BackupOutcome, String>
where
    P: PageScripting + ?Sized,
{
    pull_and_persist(page, pull, user_data_path, write_lock, || false)
}

/// Periodic cycle. Checks the shutdown flag again under the write lock, so a
/// mailbox snapshot pulled before the final backup never lands after it.
pub(crate) fn run_periodic_cycle<P>(page: &P, state: &DesktopState) -> Result<BackupOutcome, String>
where
    P: PageScripting + ?Sized,
{
    pull_and_persist(
        page,
        PageCall::PullSnapshot,
        &state.paths.user_data_path(),
        &state.user_data_write_lock,
        || state.shutdown_started(),
    )
}

fn pull_and_persist<P, S>(
    page: &P,
    pull: PageCall<'_>,
    user_data_path: &Path,
    write_lock: &Mutex<()>,
    superseded: S,
) -> Result<BackupOutcome, String>
where
    P: PageScripting + ?Sized,
    S: Fn() -> bool,
{
    let Some(raw) = pulled_text(page.run(&pull)?) else {
        return Ok(BackupOutcome::NothingToSave);
    };
    let Some(snapshot) = user_data::parse_pulled_snapshot(&raw)? else {
        return Ok(BackupOutcome::NothingToSave);
    };

    let _guard = write_lock
        .lock()
        .map_err(|_| "User data write lock poisoned.".to_string())?;
    if superseded() {
        return Ok(BackupOutcome::Superseded);
    }
    match user_data::persist_user_data(user_data_path, &snapshot)? {
        PersistOutcome::Written => Ok(BackupOutcome::Written {
            entries: snapshot.len(),
        }),
        PersistOutcome::Unchanged => Ok(BackupOutcome::Unchanged),
    }
}

pub(crate) fn spawn_backup_loop(app_handle: AppHandle) -> Result<(), String> {
    thread::Builder::new()
        .name("user-data-backup".to_string())
        .spawn(move || run_backup_loop(&app_handle))
        .map(|_| ())
        .map_err(|error| format!("Failed to spawn backup thread: {error}"))
}

fn run_backup_loop(app_handle: &AppHandle) {
    let state = app_handle.state::<DesktopState>();
    let host = WebviewScriptHost::new(app_handle.clone(), state.config.script_timeout);
    let interval: Duration = state.config.backup_interval;
    append_backup_log(&format!(
        "periodic backup every {}s to {}",
        interval.as_secs(),
        state.paths.user_data_path().display()
    ));

    loop {
        thread::sleep(interval);
        if state.shutdown_started() {
            append_backup_log("process is quitting; periodic backup stopped");
            return;
        }

        match run_periodic_cycle(&host, &state) {
            Ok(BackupOutcome::Written { entries }) => {
                append_backup_log(&format!("saved {entries} user data entries"));
            }
            Ok(BackupOutcome::Superseded) => {
                append_backup_log("final backup started; periodic snapshot discarded");
                return;
            }
            Ok(BackupOutcome::Unchanged | BackupOutcome::NothingToSave) => {}
            Err(error) => append_backup_log(&format!("backup cycle failed: {error}")),
        }
    }
}
