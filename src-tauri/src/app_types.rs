use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use crate::{
    desktop_bridge::StartupInputs, page_script_host::ScriptResultRegistry,
    runtime_config::RuntimeConfig, runtime_paths::RuntimePaths,
};

#[derive(Debug)]
pub(crate) struct DesktopState {
    pub(crate) paths: RuntimePaths,
    pub(crate) config: RuntimeConfig,
    pub(crate) data_dir_ready: bool,
    pub(crate) dataset_missing: bool,
    pub(crate) startup_inputs: Mutex<Option<StartupInputs>>,
    pub(crate) script_results: ScriptResultRegistry,
    pub(crate) user_data_write_lock: Mutex<()>,
    pub(crate) is_quitting: AtomicBool,
    pub(crate) is_flushing: AtomicBool,
}

impl DesktopState {
    pub(crate) fn new(
        paths: RuntimePaths,
        config: RuntimeConfig,
        data_dir_ready: bool,
        inputs: StartupInputs,
    ) -> Self {
        Self {
            paths,
            config,
            data_dir_ready,
            dataset_missing: inputs.dataset.is_none(),
            startup_inputs: Mutex::new(Some(inputs)),
            script_results: ScriptResultRegistry::default(),
            user_data_write_lock: Mutex::new(()),
            is_quitting: AtomicBool::new(false),
            is_flushing: AtomicBool::new(false),
        }
    }

    /// Hands the startup inputs to the caller once; later calls get `None`.
    pub(crate) fn take_startup_inputs(&self) -> Option<StartupInputs> {
        self.startup_inputs
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
    }

    pub(crate) fn is_quitting(&self) -> bool {
        self.is_quitting.load(Ordering::Acquire)
    }

    pub(crate) fn mark_quitting(&self) {
        self.is_quitting.store(true, Ordering::Release);
    }

    /// Claims the final backup. Only the first caller gets `true`; the flag
    /// stays set until the process exits.
    pub(crate) fn begin_shutdown(&self) -> bool {
        self.is_flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.is_flushing.load(Ordering::Acquire)
    }

    /// True once the final backup was claimed or the process is exiting.
    pub(crate) fn shutdown_started(&self) -> bool {
        self.is_quitting() || self.is_flushing()
    }
}
