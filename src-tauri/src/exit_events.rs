use std::thread;

use tauri::{AppHandle, ExitRequestApi, Manager};

use crate::{
    append_shutdown_log,
    backup_loop::{self, BackupOutcome},
    page_script_host::{PageScripting, WebviewScriptHost},
    page_scripts::PageCall,
    DesktopState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseDecision {
    Allow,
    IgnoreBecauseFlushInProgress,
    FlushThenExit,
}

pub(crate) fn decide_close(is_quitting: bool, is_flushing: bool) -> CloseDecision {
    if is_quitting {
        CloseDecision::Allow
    } else if is_flushing {
        CloseDecision::IgnoreBecauseFlushInProgress
    } else {
        CloseDecision::FlushThenExit
    }
}

/// Called for the main window's close request. Returns `true` when the close
/// must be prevented because a final flush runs first.
pub(crate) fn handle_close_requested(app_handle: &AppHandle) -> bool {
    let state = app_handle.state::<DesktopState>();
    match decide_close(state.is_quitting(), state.is_flushing()) {
        CloseDecision::Allow => false,
        CloseDecision::FlushThenExit if state.begin_shutdown() => {
            spawn_flush_then_exit(app_handle.clone());
            true
        }
        CloseDecision::IgnoreBecauseFlushInProgress | CloseDecision::FlushThenExit => {
            append_shutdown_log("close requested again while final backup is running");
            true
        }
    }
}

pub(crate) fn handle_exit_requested(app_handle: &AppHandle, api: &ExitRequestApi) {
    if handle_close_requested(app_handle) {
        api.prevent_exit();
    }
}

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    let state = app_handle.state::<DesktopState>();
    state.mark_quitting();
    append_shutdown_log("desktop process exiting");
}

fn spawn_flush_then_exit(app_handle: AppHandle) {
    let worker_app = app_handle.clone();
    let spawn_result = thread::Builder::new()
        .name("final-backup".to_string())
        .spawn(move || {
            let state = worker_app.state::<DesktopState>();
            if state.data_dir_ready {
                let host =
                    WebviewScriptHost::new(worker_app.clone(), state.config.shutdown_timeout);
                flush_user_data(&host, &state);
            } else {
                append_shutdown_log("data directory unavailable; skipping final backup");
            }

            state.mark_quitting();
            worker_app.exit(0);
        });

    if let Err(error) = spawn_result {
        append_shutdown_log(&format!(
            "failed to spawn final backup thread, exiting without it: {error}"
        ));
        app_handle.state::<DesktopState>().mark_quitting();
        app_handle.exit(0);
    }
}

/// Final pull-and-persist, best effort. Runs after [`DesktopState::begin_shutdown`],
/// which keeps periodic cycles from writing after it.
pub(crate) fn flush_user_data<P>(page: &P, state: &DesktopState) -> Option<BackupOutcome>
where
    P: PageScripting + ?Sized,
{
    let user_data_path = state.paths.user_data_path();
    match backup_loop::run_backup_cycle(
        page,
        PageCall::FinalPullSnapshot,
        &user_data_path,
        &state.user_data_write_lock,
    ) {
        Ok(outcome) => {
            if let BackupOutcome::Written { entries } = outcome {
                append_shutdown_log(&format!(
                    "saved {entries} user data entries to {}",
                    user_data_path.display()
                ));
            }
            Some(outcome)
        }
        Err(error) => {
            append_shutdown_log(&format!("final backup failed: {error}"));
            None
        }
    }
}
