use std::{env, time::Duration};

use crate::{
    BACKUP_INTERVAL_ENV, DEFAULT_BACKUP_INTERVAL_SECS, DEFAULT_PROBE_ATTEMPTS,
    DEFAULT_PROBE_INTERVAL_MS, DEFAULT_SAVE_HOOK_INTERVAL_SECS, DEFAULT_SCRIPT_TIMEOUT_MS,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, PROBE_ATTEMPTS_ENV, PROBE_INTERVAL_ENV, SAVE_HOOK_INTERVAL_ENV,
    SCRIPT_TIMEOUT_ENV, SHUTDOWN_TIMEOUT_ENV,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuntimeConfig {
    pub(crate) backup_interval: Duration,
    pub(crate) save_hook_interval: Duration,
    pub(crate) probe_attempts: u32,
    pub(crate) probe_interval: Duration,
    pub(crate) script_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backup_interval: Duration::from_secs(DEFAULT_BACKUP_INTERVAL_SECS),
            save_hook_interval: Duration::from_secs(DEFAULT_SAVE_HOOK_INTERVAL_SECS),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
            script_timeout: Duration::from_millis(DEFAULT_SCRIPT_TIMEOUT_MS),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }
}

impl RuntimeConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: u64| parse_positive_u64(lookup(key).as_deref(), default);

        Self {
            backup_interval: Duration::from_secs(read(
                BACKUP_INTERVAL_ENV,
                DEFAULT_BACKUP_INTERVAL_SECS,
            )),
            save_hook_interval: Duration::from_secs(read(
                SAVE_HOOK_INTERVAL_ENV,
                DEFAULT_SAVE_HOOK_INTERVAL_SECS,
            )),
            probe_attempts: u32::try_from(read(
                PROBE_ATTEMPTS_ENV,
                u64::from(DEFAULT_PROBE_ATTEMPTS),
            ))
            .unwrap_or(DEFAULT_PROBE_ATTEMPTS),
            probe_interval: Duration::from_millis(read(
                PROBE_INTERVAL_ENV,
                DEFAULT_PROBE_INTERVAL_MS,
            )),
            script_timeout: Duration::from_millis(read(
                SCRIPT_TIMEOUT_ENV,
                DEFAULT_SCRIPT_TIMEOUT_MS,
            )),
            shutdown_timeout: Duration::from_millis(read(
                SHUTDOWN_TIMEOUT_ENV,
                DEFAULT_SHUTDOWN_TIMEOUT_MS,
            )),
        }
    }
}

/// Missing, blank, unparsable and zero values all fall back to `default`.
pub(crate) fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.map(str::trim)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
