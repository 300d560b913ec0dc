//! Scripts evaluated inside the map page.
//!
//! The page contract is a handful of globals:
//! - `SMOverviewMap.init(json)` is the frontend entry point; its presence is
//!   the readiness signal.
//! - `window.__dataRestorePromise` gates the page's own initialization until
//!   restored user data is in local storage (`pending` -> `resolved`).
//! - `window.__userDataToSave` is a single-slot mailbox filled by the unload
//!   listener and the in-page timer, drained by the backup pull.
//! - `window.__cellsJsonNotFound` tells the page not to fall back to loading
//!   the dataset itself.

use std::time::Duration;

use crate::{dataset::DatasetBlob, user_data::UserDataSnapshot, USER_DATA_KEY_PREFIX};

pub(crate) const REPORT_SCRIPT_RESULT_COMMAND: &str = "desktop_bridge_report_script_result";

#[derive(Debug, Clone, Copy)]
pub(crate) enum PageCall<'a> {
    InstallRestorePromise,
    ProbeReady,
    InitDataset(&'a DatasetBlob),
    RestoreUserData(&'a UserDataSnapshot),
    ResolveRestorePromise,
    ArmSaveHooks { interval: Duration },
    PullSnapshot,
    FinalPullSnapshot,
    NotifyDatasetMissing,
}

impl PageCall<'_> {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::InstallRestorePromise => "install-restore-promise",
            Self::ProbeReady => "probe-ready",
            Self::InitDataset(_) => "init-dataset",
            Self::RestoreUserData(_) => "restore-user-data",
            Self::ResolveRestorePromise => "resolve-restore-promise",
            Self::ArmSaveHooks { .. } => "arm-save-hooks",
            Self::PullSnapshot => "pull-snapshot",
            Self::FinalPullSnapshot => "final-pull-snapshot",
            Self::NotifyDatasetMissing => "notify-dataset-missing",
        }
    }

    pub(crate) fn to_script(&self) -> Result<String, String> {
        match self {
            Self::InstallRestorePromise => Ok(install_restore_promise_script()),
            Self::ProbeReady => Ok(PROBE_READY_SCRIPT.to_string()),
            Self::InitDataset(blob) => init_dataset_script(blob),
            Self::RestoreUserData(snapshot) => restore_user_data_script(snapshot),
            Self::ResolveRestorePromise => Ok(RESOLVE_RESTORE_PROMISE_SCRIPT.to_string()),
            Self::ArmSaveHooks { interval } => arm_save_hooks_script(*interval),
            Self::PullSnapshot => pull_snapshot_script(),
            Self::FinalPullSnapshot => final_pull_snapshot_script(),
            Self::NotifyDatasetMissing => Ok(NOTIFY_DATASET_MISSING_SCRIPT.to_string()),
        }
    }
}

fn js_string_literal(value: &str) -> Result<String, String> {
    serde_json::to_string(value).map_err(|error| format!("Failed to encode script string: {error}"))
}

fn collect_user_data_function() -> Result<String, String> {
    Ok(format!(
        r#"function () {{
    var prefix = {prefix};
    var snapshot = {{}};
    for (var i = 0; i < localStorage.length; i++) {{
        var key = localStorage.key(i);
        if (key && key.indexOf(prefix) === 0) {{
            snapshot[key] = localStorage.getItem(key);
        }}
    }}
    return JSON.stringify(snapshot);
}}"#,
        prefix = js_string_literal(USER_DATA_KEY_PREFIX)?
    ))
}

/// Also installed as a window initialization script, so it runs before the
/// page's own scripts.
pub(crate) fn install_restore_promise_script() -> String {
    r#"(function () {
    if (window.__dataRestorePromise) {
        return true;
    }
    var gate = {
        state: 'pending',
        callbacks: [],
        then: function (callback) {
            if (this.state === 'resolved') {
                callback();
            } else {
                this.callbacks.push(callback);
            }
        },
        resolve: function () {
            if (this.state === 'resolved') {
                return;
            }
            this.state = 'resolved';
            try {
                sessionStorage.setItem('__smDataRestored', '1');
            } catch (e) {}
            var queued = this.callbacks.splice(0, this.callbacks.length);
            for (var i = 0; i < queued.length; i++) {
                try {
                    queued[i]();
                } catch (e) {
                    console.warn('data restore callback failed:', e);
                }
            }
        }
    };
    window.__dataRestorePromise = gate;
    window.__waitForDataRestore = new Promise(function (resolve) {
        gate.then(resolve);
    });
    try {
        // A reload within the session has nothing left to wait for.
        if (sessionStorage.getItem('__smDataRestored') === '1') {
            gate.resolve();
        }
    } catch (e) {}
    return true;
})();"#
        .to_string()
}

const PROBE_READY_SCRIPT: &str = "typeof SMOverviewMap !== 'undefined'";

const RESOLVE_RESTORE_PROMISE_SCRIPT: &str = r#"(function () {
    if (window.__dataRestorePromise) {
        window.__dataRestorePromise.resolve();
    }
    return true;
})();"#;

fn init_dataset_script(blob: &DatasetBlob) -> Result<String, String> {
    let literal = js_string_literal(blob.as_str())?;
    Ok(format!(
        r#"(function (payload) {{
    window.__cellsJsonData = payload;
    if (typeof SMOverviewMap !== 'undefined' && typeof SMOverviewMap.init === 'function') {{
        SMOverviewMap.init(payload);
        return true;
    }}
    return false;
}})({literal});"#
    ))
}

fn restore_user_data_script(snapshot: &UserDataSnapshot) -> Result<String, String> {
    let backup = serde_json::to_string(snapshot.entries())
        .map_err(|error| format!("Failed to encode user data for restore: {error}"))?;
    Ok(format!(
        r#"(function (backup) {{
    if (!window.localStorage) {{
        throw new Error('localStorage is unavailable');
    }}
    var keys = Object.keys(backup);
    for (var i = 0; i < keys.length; i++) {{
        localStorage.setItem(keys[i], backup[keys[i]]);
    }}
    console.log('Restored user data from backup file:', keys);
    if (window.__dataRestorePromise) {{
        window.__dataRestorePromise.resolve();
    }}
    if (typeof SMOverviewMap !== 'undefined' && typeof SMOverviewMap.init === 'function') {{
        if (typeof loadSettings === 'function') {{
            loadSettings();
        }}
        if (typeof loadRoutes === 'function') {{
            loadRoutes();
        }}
        if (typeof updateLastRouteButton === 'function') {{
            updateLastRouteButton();
        }}
    }}
    return keys.length;
}})({backup});"#
    ))
}

fn arm_save_hooks_script(interval: Duration) -> Result<String, String> {
    let interval_ms = interval.as_millis().max(1);
    Ok(format!(
        r#"(function () {{
    var collect = {collect};
    var capture = function () {{
        try {{
            window.__userDataToSave = collect();
        }} catch (e) {{
            console.warn('Failed to backup localStorage:', e);
        }}
    }};
    if (!window.__userDataUnloadHook) {{
        window.__userDataUnloadHook = capture;
        window.addEventListener('beforeunload', capture);
    }}
    if (!window.__backupInterval) {{
        window.__backupInterval = setInterval(capture, {interval_ms});
    }}
    return true;
}})();"#,
        collect = collect_user_data_function()?,
    ))
}

fn pull_snapshot_script() -> Result<String, String> {
    Ok(format!(
        r#"(function () {{
    try {{
        if (window.__userDataToSave) {{
            var pending = window.__userDataToSave;
            window.__userDataToSave = null;
            return pending;
        }}
        return ({collect})();
    }} catch (e) {{
        return '{{}}';
    }}
}})();"#,
        collect = collect_user_data_function()?,
    ))
}

fn final_pull_snapshot_script() -> Result<String, String> {
    Ok(format!(
        r#"(function () {{
    try {{
        return ({collect})();
    }} catch (e) {{
        return '{{}}';
    }}
}})();"#,
        collect = collect_user_data_function()?,
    ))
}

const NOTIFY_DATASET_MISSING_SCRIPT: &str = r#"(function () {
    var alreadyNotified = window.__cellsJsonNotFound === true;
    window.__cellsJsonNotFound = true;
    if (alreadyNotified) {
        return false;
    }
    var folder = window.location.pathname.replace(/[^/]*$/, '');
    setTimeout(function () {
        alert('ERROR: cells.json not found!\n\nPlease place cells.json in the data folder next to the application:\n' + folder + '\n\nThe application will continue but may not function correctly without cells.json.');
    }, 0);
    return true;
})();"#;

/// Wraps a page script so its completion value is reported back through the
/// IPC command registered under [`REPORT_SCRIPT_RESULT_COMMAND`].
pub(crate) fn wrap_for_result(request_id: u64, script: &str) -> Result<String, String> {
    let source = js_string_literal(script)?;
    let command = js_string_literal(REPORT_SCRIPT_RESULT_COMMAND)?;
    Ok(format!(
        r#"(function () {{
    var report = function (ok, value, error) {{
        var ipc = window.__TAURI_INTERNALS__;
        if (!ipc || typeof ipc.invoke !== 'function') {{
            return;
        }}
        ipc.invoke({command}, {{ report: {{ id: {request_id}, ok: ok, value: value, error: error }} }});
    }};
    try {{
        var result = (0, eval)({source});
        report(true, result === undefined ? null : result, null);
    }} catch (e) {{
        report(false, null, String(e && e.message ? e.message : e));
    }}
}})();"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_dataset_script_passes_blob_as_string_literal() {
        let blob = DatasetBlob::new("{\"cells\":[\"a\\\"b\"]}\n</script>");
        let script = PageCall::InitDataset(&blob).to_script().expect("build script");
        let literal = serde_json::to_string(blob.as_str()).expect("encode literal");

        assert!(script.ends_with(&format!("}})({literal});")));
        assert_eq!(script.matches("SMOverviewMap.init(payload)").count(), 1);
        assert!(script.contains("window.__cellsJsonData = payload"));
    }

    #[test]
    fn restore_script_writes_storage_before_running_reload_hooks() {
        let snapshot: UserDataSnapshot = [("sm_x", "1"), ("sm_y", "2")].into_iter().collect();
        let script = PageCall::RestoreUserData(&snapshot)
            .to_script()
            .expect("build script");

        assert!(script.contains(r#"({"sm_x":"1","sm_y":"2"});"#));
        let set_item = script.find("localStorage.setItem").expect("setItem");
        let resolve = script
            .find("__dataRestorePromise.resolve()")
            .expect("resolve");
        let load_settings = script.find("loadSettings();").expect("loadSettings");
        let load_routes = script.find("loadRoutes();").expect("loadRoutes");
        let last_route = script
            .find("updateLastRouteButton();")
            .expect("updateLastRouteButton");
        assert!(set_item < resolve);
        assert!(resolve < load_settings);
        assert!(load_settings < load_routes && load_routes < last_route);
    }

    #[test]
    fn save_hooks_use_namespace_prefix_and_guard_timer() {
        let script = PageCall::ArmSaveHooks {
            interval: Duration::from_secs(30),
        }
        .to_script()
        .expect("build script");

        assert!(script.contains(&format!("var prefix = \"{USER_DATA_KEY_PREFIX}\";")));
        assert!(script.contains("if (!window.__backupInterval)"));
        assert!(script.contains("setInterval(capture, 30000)"));
        assert!(script.contains("addEventListener('beforeunload', capture)"));
    }

    #[test]
    fn pull_script_drains_mailbox_before_falling_back() {
        let script = PageCall::PullSnapshot.to_script().expect("build script");
        let drain = script
            .find("window.__userDataToSave = null")
            .expect("drain mailbox");
        let fallback = script.find("localStorage.length").expect("fallback");
        assert!(drain < fallback);
        assert!(script.contains("return '{}';"));

        let final_pull = PageCall::FinalPullSnapshot
            .to_script()
            .expect("build final script");
        assert!(!final_pull.contains("__userDataToSave"));
    }

    #[test]
    fn restore_promise_is_installed_once() {
        let script = PageCall::InstallRestorePromise
            .to_script()
            .expect("build script");
        assert!(script.starts_with("(function () {\n    if (window.__dataRestorePromise) {"));
        assert!(script.contains("state: 'pending'"));
        assert!(script.contains("window.__waitForDataRestore = new Promise"));
        assert!(script.contains("sessionStorage.setItem('__smDataRestored', '1')"));
        assert!(
            script.find("window.__dataRestorePromise = gate").expect("gate")
                < script.find("sessionStorage.getItem('__smDataRestored')").expect("reload check")
        );
    }

    #[test]
    fn notify_script_alerts_only_on_first_call() {
        let script = PageCall::NotifyDatasetMissing
            .to_script()
            .expect("build script");
        let guard = script.find("if (alreadyNotified)").expect("guard");
        let alert = script.find("alert(").expect("alert");
        assert!(guard < alert);
        assert_eq!(script.matches("alert(").count(), 1);
    }

    #[test]
    fn wrap_for_result_embeds_request_id_and_escaped_source() {
        let wrapped = wrap_for_result(42, "typeof SMOverviewMap !== 'undefined'")
            .expect("wrap script");
        assert!(wrapped.contains("id: 42"));
        assert!(wrapped.contains("\"desktop_bridge_report_script_result\""));
        assert!(wrapped.contains("(0, eval)(\"typeof SMOverviewMap !== 'undefined'\")"));
    }

    #[test]
    fn wrap_for_result_reports_the_shape_the_command_decodes() {
        let wrapped = wrap_for_result(7, "1 + 1").expect("wrap script");

        // Argument key and field names must match the command parameter and
        // `ScriptReport`.
        assert!(wrapped.contains(
            "ipc.invoke(\"desktop_bridge_report_script_result\", { report: { id: 7, ok: ok, value: value, error: error } });"
        ));
        assert!(wrapped.contains("report(true, result === undefined ? null : result, null);"));
        assert!(wrapped.contains("report(false, null, String(e && e.message ? e.message : e));"));

        let decoded: crate::page_script_host::ScriptReport = serde_json::from_value(
            serde_json::json!({ "id": 7, "ok": false, "value": null, "error": "boom" }),
        )
        .expect("decode report");
        assert_eq!(
            crate::page_script_host::ScriptReply::from(decoded),
            crate::page_script_host::ScriptReply::Failed("boom".to_string())
        );
    }
}
