pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const WINDOW_TITLE: &str = "Scrap Mechanic Map";
pub(crate) const DEFAULT_WINDOW_WIDTH: f64 = 1400.0;
pub(crate) const DEFAULT_WINDOW_HEIGHT: f64 = 900.0;
pub(crate) const MIN_WINDOW_WIDTH: f64 = 800.0;
pub(crate) const MIN_WINDOW_HEIGHT: f64 = 600.0;

pub(crate) const STATIC_DIR_NAME: &str = "static";
pub(crate) const ENTRY_PAGE_FILE: &str = "index.html";
pub(crate) const DATA_DIR_NAME: &str = "data";
pub(crate) const DATASET_FILE: &str = "cells.json";
pub(crate) const USER_DATA_FILE: &str = "user_data.json";
pub(crate) const README_PLACEHOLDER_FILE: &str = "!_README_!.txt";
pub(crate) const LOG_DIR_NAME: &str = "logs";
pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
pub(crate) const DESKTOP_LOG_MAX_BYTES: u64 = 2 * 1024 * 1024;

/// Local storage keys starting with this prefix are the only ones mirrored
/// between the page and `user_data.json`. The page must keep its persisted
/// settings and routes under this namespace.
pub(crate) const USER_DATA_KEY_PREFIX: &str = "sm_";

pub(crate) const BASE_DIR_ENV: &str = "SM_MAP_BASE_DIR";
pub(crate) const STATIC_DIR_ENV: &str = "SM_MAP_STATIC_DIR";
pub(crate) const BACKUP_INTERVAL_ENV: &str = "SM_MAP_BACKUP_INTERVAL_SECS";
pub(crate) const SAVE_HOOK_INTERVAL_ENV: &str = "SM_MAP_SAVE_HOOK_INTERVAL_SECS";
pub(crate) const PROBE_ATTEMPTS_ENV: &str = "SM_MAP_PROBE_ATTEMPTS";
pub(crate) const PROBE_INTERVAL_ENV: &str = "SM_MAP_PROBE_INTERVAL_MS";
pub(crate) const SCRIPT_TIMEOUT_ENV: &str = "SM_MAP_SCRIPT_TIMEOUT_MS";
pub(crate) const SHUTDOWN_TIMEOUT_ENV: &str = "SM_MAP_SHUTDOWN_TIMEOUT_MS";

pub(crate) const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 15;
pub(crate) const DEFAULT_SAVE_HOOK_INTERVAL_SECS: u64 = 30;
pub(crate) const DEFAULT_PROBE_ATTEMPTS: u32 = 10;
pub(crate) const DEFAULT_PROBE_INTERVAL_MS: u64 = 500;
pub(crate) const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 5_000;
pub(crate) const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2_000;
pub(crate) const MISSING_DATASET_NOTICE_DELAY_MS: u64 = 1_000;
