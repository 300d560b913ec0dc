#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod backup_loop;
mod dataset;
mod desktop_bridge;
mod desktop_bridge_commands;
mod exit_events;
mod logging;
mod main_window;
mod page_script_host;
mod page_scripts;
mod runtime_config;
mod runtime_paths;
mod startup_task;
mod user_data;
mod window_actions;

pub(crate) use app_constants::*;
pub(crate) use app_types::DesktopState;
pub(crate) use logging::{
    append_backup_log, append_bridge_log, append_desktop_log, append_shutdown_log,
    append_startup_log,
};

fn main() {
    app_runtime::run();
}
