use std::{thread, time::Duration};

use tauri::{AppHandle, Manager};

use crate::{
    backup_loop,
    desktop_bridge::{self, BridgeOutcome, BridgeSchedule},
    page_script_host::WebviewScriptHost,
    DesktopState, MISSING_DATASET_NOTICE_DELAY_MS,
};

/// Starts the background tasks that talk to the page once the window exists.
pub fn spawn_startup_task<F>(app_handle: AppHandle, log: F)
where
    F: Fn(&str) + Copy + Send + 'static,
{
    let state = app_handle.state::<DesktopState>();
    let dataset_missing = state.dataset_missing;
    let data_dir_ready = state.data_dir_ready;

    let bridge_app = app_handle.clone();
    if let Err(error) = thread::Builder::new()
        .name("page-bridge".to_string())
        .spawn(move || run_bridge_task(&bridge_app))
    {
        log(&format!("failed to spawn page bridge thread: {error}"));
    }

    if dataset_missing {
        let notice_app = app_handle.clone();
        if let Err(error) = thread::Builder::new()
            .name("dataset-notice".to_string())
            .spawn(move || run_dataset_notice_task(&notice_app))
        {
            log(&format!("failed to spawn dataset notice thread: {error}"));
        }
    }

    if data_dir_ready {
        if let Err(error) = backup_loop::spawn_backup_loop(app_handle.clone()) {
            log(&error);
        }
    } else {
        log("data directory unavailable; periodic user data backup disabled");
    }
}

fn run_bridge_task(app_handle: &AppHandle) {
    let state = app_handle.state::<DesktopState>();
    let Some(inputs) = state.take_startup_inputs() else {
        crate::append_bridge_log("startup inputs already consumed; bridge not started again");
        return;
    };

    let host = WebviewScriptHost::new(app_handle.clone(), state.config.script_timeout);
    let schedule = BridgeSchedule {
        probe_attempts: state.config.probe_attempts,
        probe_interval: state.config.probe_interval,
        save_hook_interval: state.config.save_hook_interval,
    };
    match desktop_bridge::run_bridge(&host, inputs, schedule, crate::append_bridge_log) {
        BridgeOutcome::Pushed(report) => crate::append_bridge_log(&format!(
            "page ready on probe {}: dataset_injected={} restored_entries={} hooks_armed={}",
            report.ready_on_attempt,
            report.dataset_injected,
            report.restored_entries,
            report.hooks_armed
        )),
        BridgeOutcome::NeverReady { attempts } => crate::append_bridge_log(&format!(
            "bridge gave up after {attempts} readiness probes"
        )),
    }
}

fn run_dataset_notice_task(app_handle: &AppHandle) {
    thread::sleep(Duration::from_millis(MISSING_DATASET_NOTICE_DELAY_MS));
    let state = app_handle.state::<DesktopState>();
    let host = WebviewScriptHost::new(app_handle.clone(), state.config.script_timeout);
    if desktop_bridge::notify_dataset_missing(
        &host,
        state.config.probe_attempts,
        state.config.probe_interval,
        crate::append_bridge_log,
    ) {
        crate::append_bridge_log(&format!(
            "notified page that cells.json is missing (expected at {})",
            state.paths.dataset_path().display()
        ));
    }
}
