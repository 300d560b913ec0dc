use std::{thread, time::Duration};

use serde_json::Value;

use crate::{
    dataset::DatasetBlob, page_script_host::PageScripting, page_scripts::PageCall,
    user_data::UserDataSnapshot,
};

/// Inputs read once at startup and pushed into the page exactly once.
#[derive(Debug, Default)]
pub(crate) struct StartupInputs {
    pub(crate) dataset: Option<DatasetBlob>,
    pub(crate) user_data: Option<UserDataSnapshot>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BridgeSchedule {
    pub(crate) probe_attempts: u32,
    pub(crate) probe_interval: Duration,
    pub(crate) save_hook_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BridgeOutcome {
    Pushed(PushReport),
    NeverReady { attempts: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PushReport {
    pub(crate) ready_on_attempt: u32,
    pub(crate) dataset_injected: bool,
    pub(crate) restored_entries: usize,
    pub(crate) hooks_armed: bool,
}

fn is_ready(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

/// Waits for the page to define its entry point, then pushes the dataset and
/// the restored snapshot and arms the page-side save hooks. Nothing is sent
/// before the first successful probe, so no script lands in a document that
/// is still navigating.
pub(crate) fn run_bridge<P, F>(
    page: &P,
    inputs: StartupInputs,
    schedule: BridgeSchedule,
    log: F,
) -> BridgeOutcome
where
    P: PageScripting + ?Sized,
    F: Fn(&str),
{
    let attempts = schedule.probe_attempts.max(1);
    for attempt in 1..=attempts {
        thread::sleep(schedule.probe_interval);
        match page.run(&PageCall::ProbeReady) {
            Ok(value) if is_ready(&value) => {
                let mut report = push_inputs(page, &inputs, schedule, &log);
                report.ready_on_attempt = attempt;
                return BridgeOutcome::Pushed(report);
            }
            Ok(_) => {}
            Err(error) => {
                if attempt == attempts {
                    log(&format!(
                        "page readiness probe failed on final attempt: {error}"
                    ));
                }
            }
        }
    }

    log(&format!(
        "page never reported readiness after {attempts} attempts; skipping data injection"
    ));
    BridgeOutcome::NeverReady { attempts }
}

fn push_inputs<P, F>(
    page: &P,
    inputs: &StartupInputs,
    schedule: BridgeSchedule,
    log: &F,
) -> PushReport
where
    P: PageScripting + ?Sized,
    F: Fn(&str),
{
    let mut report = PushReport::default();

    // The window installs the gate before any page script runs; this is the
    // idempotent fallback for a page that came up without it.
    if inputs.user_data.is_some() {
        if let Err(error) = page.run(&PageCall::InstallRestorePromise) {
            log(&format!("failed to install data restore promise: {error}"));
        }
    }

    if let Some(dataset) = &inputs.dataset {
        match page.run(&PageCall::InitDataset(dataset)) {
            Ok(value) => {
                report.dataset_injected = true;
                if is_ready(&value) {
                    log(&format!(
                        "injected cells.json into page ({} characters)",
                        dataset.len()
                    ));
                } else {
                    log("stored cells.json on page but SMOverviewMap.init is not a function");
                }
            }
            Err(error) => log(&format!("failed to inject cells.json: {error}")),
        }
    }

    if let Some(snapshot) = &inputs.user_data {
        match page.run(&PageCall::RestoreUserData(snapshot)) {
            Ok(_) => {
                report.restored_entries = snapshot.len();
                log(&format!(
                    "restored {} user data entries from backup file",
                    snapshot.len()
                ));
            }
            Err(error) => {
                log(&format!("failed to restore user data: {error}"));
                if let Err(error) = page.run(&PageCall::ResolveRestorePromise) {
                    log(&format!("failed to release data restore promise: {error}"));
                }
            }
        }
    }

    match page.run(&PageCall::ArmSaveHooks {
        interval: schedule.save_hook_interval,
    }) {
        Ok(_) => report.hooks_armed = true,
        Err(error) => log(&format!("failed to arm page save hooks: {error}")),
    }

    report
}

/// Flags the missing dataset in the page and shows a single alert. Retries
/// until one script call succeeds; the page-side flag keeps the alert unique.
pub(crate) fn notify_dataset_missing<P, F>(
    page: &P,
    attempts: u32,
    interval: Duration,
    log: F,
) -> bool
where
    P: PageScripting + ?Sized,
    F: Fn(&str),
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match page.run(&PageCall::NotifyDatasetMissing) {
            Ok(_) => return true,
            Err(error) => {
                if attempt == attempts {
                    log(&format!("failed to show missing cells.json notice: {error}"));
                    return false;
                }
                thread::sleep(interval);
            }
        }
    }
    false
}
