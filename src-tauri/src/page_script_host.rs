use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Mutex, MutexGuard, TryLockError,
    },
    thread,
    time::{Duration, Instant},
};

use serde::Deserialize;
use serde_json::Value;
use tauri::{AppHandle, Manager};

use crate::{page_scripts, page_scripts::PageCall, DesktopState, MAIN_WINDOW_LABEL};

/// The one operation the window exposes to background tasks: run a script in
/// the page and hand back its completion value.
pub(crate) trait PageScripting: Send + Sync {
    fn run(&self, call: &PageCall<'_>) -> Result<Value, String>;
}

/// Payload the wrapped script sends back over IPC.
#[derive(Debug, Deserialize)]
pub(crate) struct ScriptReport {
    pub(crate) id: u64,
    pub(crate) ok: bool,
    #[serde(default)]
    pub(crate) value: Option<Value>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptReply {
    Value(Value),
    Failed(String),
}

impl From<ScriptReport> for ScriptReply {
    fn from(report: ScriptReport) -> Self {
        if report.ok {
            Self::Value(report.value.unwrap_or(Value::Null))
        } else {
            Self::Failed(
                report
                    .error
                    .unwrap_or_else(|| "page script failed".to_string()),
            )
        }
    }
}

/// Matches results reported by the page to the callers waiting for them.
///
/// Calls are serialized: a caller holds [`ScriptResultRegistry::serialize_until`]
/// for the whole evaluate-and-wait round trip, so scripts from different
/// background tasks never interleave inside the page.
#[derive(Debug, Default)]
pub(crate) struct ScriptResultRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Sender<ScriptReply>>>,
    call_lock: Mutex<()>,
}

impl ScriptResultRegistry {
    /// Waits for earlier calls to finish, giving up at `deadline`.
    pub(crate) fn serialize_until(&self, deadline: Instant) -> Option<MutexGuard<'_, ()>> {
        loop {
            match self.call_lock.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep((deadline - now).min(CALL_LOCK_POLL_INTERVAL));
        }
    }

    pub(crate) fn register(&self) -> Result<(u64, Receiver<ScriptReply>), String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = mpsc::channel();
        self.pending
            .lock()
            .map_err(|_| "Script result registry lock poisoned.".to_string())?
            .insert(id, sender);
        Ok((id, receiver))
    }

    /// Returns `false` when nobody waits for `id` any more (late or unknown).
    pub(crate) fn complete(&self, id: u64, reply: ScriptReply) -> bool {
        let sender = match self.pending.lock() {
            Ok(mut guard) => guard.remove(&id),
            Err(_) => None,
        };
        match sender {
            Some(sender) => sender.send(reply).is_ok(),
            None => false,
        }
    }

    pub(crate) fn cancel(&self, id: u64) {
        if let Ok(mut guard) = self.pending.lock() {
            guard.remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub(crate) fn wait(
        &self,
        id: u64,
        receiver: &Receiver<ScriptReply>,
        timeout: Duration,
        label: &str,
    ) -> Result<Value, String> {
        match receiver.recv_timeout(timeout) {
            Ok(ScriptReply::Value(value)) => Ok(value),
            Ok(ScriptReply::Failed(error)) => {
                Err(format!("page script '{label}' raised: {error}"))
            }
            Err(RecvTimeoutError::Timeout) => {
                self.cancel(id);
                Err(format!(
                    "page script '{label}' timed out after {}ms",
                    timeout.as_millis()
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.cancel(id);
                Err(format!("page script '{label}' was abandoned"))
            }
        }
    }
}

const CALL_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs page scripts in the main webview window. The timeout covers the whole
/// call, including the wait behind earlier scripts.
#[derive(Clone)]
pub(crate) struct WebviewScriptHost {
    app_handle: AppHandle,
    timeout: Duration,
}

impl WebviewScriptHost {
    pub(crate) fn new(app_handle: AppHandle, timeout: Duration) -> Self {
        Self {
            app_handle,
            timeout,
        }
    }
}

impl PageScripting for WebviewScriptHost {
    fn run(&self, call: &PageCall<'_>) -> Result<Value, String> {
        let script = call.to_script()?;
        let state = self.app_handle.state::<DesktopState>();
        let registry = &state.script_results;

        let deadline = Instant::now() + self.timeout;
        let Some(_serial) = registry.serialize_until(deadline) else {
            return Err(format!(
                "page script '{}' gave up after {}ms waiting for an earlier script",
                call.label(),
                self.timeout.as_millis()
            ));
        };
        let window = self
            .app_handle
            .get_webview_window(MAIN_WINDOW_LABEL)
            .ok_or_else(|| "Main window is unavailable.".to_string())?;
        let (id, receiver) = registry.register()?;
        let wrapped = match page_scripts::wrap_for_result(id, &script) {
            Ok(wrapped) => wrapped,
            Err(error) => {
                registry.cancel(id);
                return Err(error);
            }
        };
        if let Err(error) = window.eval(&wrapped) {
            registry.cancel(id);
            return Err(format!(
                "Failed to evaluate page script '{}': {}",
                call.label(),
                error
            ));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        registry.wait(id, &receiver, remaining, call.label())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{collections::BTreeMap, sync::Mutex};

    use serde_json::Value;

    use super::PageScripting;
    use crate::{page_scripts::PageCall, USER_DATA_KEY_PREFIX};

    #[derive(Debug, Default)]
    pub(crate) struct FakePageState {
        pub(crate) calls: Vec<&'static str>,
        pub(crate) probes: usize,
        pub(crate) ready_after_probes: Option<usize>,
        pub(crate) init_payloads: Vec<String>,
        pub(crate) local_storage: BTreeMap<String, String>,
        pub(crate) storage_when_restore_resolved: Option<BTreeMap<String, String>>,
        pub(crate) restore_promise_installed: bool,
        pub(crate) restore_resolved: bool,
        pub(crate) hooks_armed: usize,
        pub(crate) mailbox: Option<String>,
        pub(crate) dataset_missing_flag: bool,
        pub(crate) alerts: usize,
        pub(crate) failing_calls: Vec<&'static str>,
        pub(crate) pull_override: Option<Value>,
    }

    /// In-memory stand-in for the map page that models the globals the real
    /// scripts touch.
    #[derive(Debug, Default)]
    pub(crate) struct FakePage {
        pub(crate) state: Mutex<FakePageState>,
    }

    impl FakePage {
        pub(crate) fn ready_after(probes: usize) -> Self {
            let page = Self::default();
            page.with_state(|state| state.ready_after_probes = Some(probes));
            page
        }

        pub(crate) fn never_ready() -> Self {
            Self::default()
        }

        pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut FakePageState) -> R) -> R {
            let mut guard = self.state.lock().expect("fake page lock");
            f(&mut guard)
        }

        fn collect(state: &FakePageState) -> String {
            let snapshot: BTreeMap<&String, &String> = state
                .local_storage
                .iter()
                .filter(|(key, _)| key.starts_with(USER_DATA_KEY_PREFIX))
                .collect();
            serde_json::to_string(&snapshot).expect("encode fake snapshot")
        }
    }

    impl PageScripting for FakePage {
        fn run(&self, call: &PageCall<'_>) -> Result<Value, String> {
            self.with_state(|state| {
                let label = call.label();
                state.calls.push(label);
                if state.failing_calls.contains(&label) {
                    return Err(format!("page script '{label}' raised: boom"));
                }

                match call {
                    PageCall::InstallRestorePromise => {
                        state.restore_promise_installed = true;
                        Ok(Value::Bool(true))
                    }
                    PageCall::ProbeReady => {
                        state.probes += 1;
                        let ready = state
                            .ready_after_probes
                            .is_some_and(|needed| state.probes >= needed);
                        Ok(Value::Bool(ready))
                    }
                    PageCall::InitDataset(blob) => {
                        state.init_payloads.push(blob.as_str().to_string());
                        Ok(Value::Bool(true))
                    }
                    PageCall::RestoreUserData(snapshot) => {
                        for (key, value) in snapshot.entries() {
                            state.local_storage.insert(key.clone(), value.clone());
                        }
                        if state.restore_promise_installed {
                            state.restore_resolved = true;
                            state.storage_when_restore_resolved =
                                Some(state.local_storage.clone());
                        }
                        Ok(Value::from(snapshot.len()))
                    }
                    PageCall::ResolveRestorePromise => {
                        if state.restore_promise_installed {
                            state.restore_resolved = true;
                        }
                        Ok(Value::Bool(true))
                    }
                    PageCall::ArmSaveHooks { .. } => {
                        state.hooks_armed += 1;
                        Ok(Value::Bool(true))
                    }
                    PageCall::PullSnapshot => {
                        if let Some(value) = state.pull_override.clone() {
                            return Ok(value);
                        }
                        if let Some(pending) = state.mailbox.take() {
                            return Ok(Value::String(pending));
                        }
                        Ok(Value::String(Self::collect(state)))
                    }
                    PageCall::FinalPullSnapshot => Ok(Value::String(Self::collect(state))),
                    PageCall::NotifyDatasetMissing => {
                        let first = !state.dataset_missing_flag;
                        state.dataset_missing_flag = true;
                        if first {
                            state.alerts += 1;
                        }
                        Ok(Value::Bool(first))
                    }
                }
            })
        }
    }
}
