use tauri::{AppHandle, Manager};

use crate::{append_bridge_log, page_script_host::ScriptReport, DesktopState};

/// Receives the completion value of a script evaluated through
/// [`crate::page_script_host::WebviewScriptHost`].
#[tauri::command]
pub(crate) fn desktop_bridge_report_script_result(app_handle: AppHandle, report: ScriptReport) {
    let state = app_handle.state::<DesktopState>();
    let id = report.id;
    if !state.script_results.complete(id, report.into()) {
        append_bridge_log(&format!(
            "dropped page script result {id}: no caller is waiting for it"
        ));
    }
}
