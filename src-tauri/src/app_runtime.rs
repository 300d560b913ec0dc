use std::{
    io::{self, BufRead, IsTerminal},
    process,
};

use tauri::{Manager, RunEvent, WindowEvent};

use crate::{
    append_desktop_log, append_startup_log,
    dataset::{self, DatasetLoad},
    desktop_bridge::StartupInputs,
    exit_events, logging, main_window,
    runtime_config::RuntimeConfig,
    runtime_paths::{self, RuntimePaths},
    startup_task, user_data, window_actions, DesktopState, MAIN_WINDOW_LABEL,
};

fn load_startup_inputs(paths: &RuntimePaths, data_dir_ready: bool) -> StartupInputs {
    if !data_dir_ready {
        append_startup_log("data directory unavailable; skipping cells.json and user data backup");
        return StartupInputs::default();
    }

    let dataset_path = paths.dataset_path();
    let dataset = match dataset::load_dataset(&dataset_path) {
        DatasetLoad::Loaded(blob) => {
            append_startup_log(&format!(
                "read cells.json from {} ({} characters)",
                dataset_path.display(),
                blob.len()
            ));
            Some(blob)
        }
        DatasetLoad::Missing => {
            append_startup_log(&format!(
                "cells.json not found at {}; continuing without it. Place cells.json in {}",
                dataset_path.display(),
                paths.data_dir().display()
            ));
            None
        }
        DatasetLoad::Unreadable(error) => {
            append_startup_log(&error);
            None
        }
    };

    let user_data_path = paths.user_data_path();
    let user_data = match user_data::load_user_data(&user_data_path, append_startup_log) {
        Ok(Some(snapshot)) => {
            append_startup_log(&format!(
                "loaded user data backup: {} items",
                snapshot.len()
            ));
            Some(snapshot)
        }
        Ok(None) => {
            append_startup_log(&format!(
                "no user data backup at {}; it is created on the first save",
                user_data_path.display()
            ));
            None
        }
        Err(error) => {
            append_startup_log(&format!("failed to load user data backup: {error}"));
            None
        }
    };

    StartupInputs { dataset, user_data }
}

fn window_start_failure(error: &dyn std::fmt::Display) -> String {
    format!("Failed to start application window: {error}")
}

/// Logs the failure, waits for the operator and exits 1. Used from `setup`
/// as well, where returning an error would make the runtime panic instead.
fn abort_window_start(error: &dyn std::fmt::Display) -> ! {
    let message = window_start_failure(error);
    append_startup_log(&message);
    exit_after_operator_ack(&message);
}

fn exit_after_operator_ack(message: &str) -> ! {
    eprintln!("{message}");
    if io::stdin().is_terminal() {
        eprintln!("Press Enter to exit...");
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
    process::exit(1);
}

pub(crate) fn run() {
    append_startup_log("Scrap Mechanic Map desktop process starting");

    let paths = RuntimePaths::resolve();
    let data_dir_ready = match runtime_paths::ensure_data_dir(&paths, append_startup_log) {
        Ok(data_dir) => {
            if let Err(error) = logging::init_desktop_log_file(paths.desktop_log_path()) {
                append_startup_log(&format!("file logging disabled: {error}"));
            }
            append_startup_log(&format!("data dir: {}", data_dir.display()));
            true
        }
        Err(error) => {
            append_startup_log(&error);
            false
        }
    };
    append_startup_log(&format!("base dir: {}", paths.base_dir.display()));
    append_startup_log(&format!("static dir: {}", paths.static_dir.display()));

    let entry_url = match main_window::verify_entry_page(&paths) {
        Ok(url) => url,
        Err(diagnostic) => {
            append_startup_log(&diagnostic);
            process::exit(1);
        }
    };

    let config = RuntimeConfig::from_env();
    let inputs = load_startup_inputs(&paths, data_dir_ready);
    let restore_pending = inputs.user_data.is_some();
    append_startup_log(&format!("loading {entry_url}"));

    let builder = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, args, _cwd| {
            window_actions::focus_existing_instance(app, &args, append_desktop_log);
        }))
        .manage(DesktopState::new(paths, config, data_dir_ready, inputs))
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::desktop_bridge_report_script_result,
        ])
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }

            if let WindowEvent::CloseRequested { api, .. } = event {
                if exit_events::handle_close_requested(window.app_handle()) {
                    api.prevent_close();
                }
            }
        })
        .setup(move |app| {
            let app_handle = app.handle().clone();
            if let Err(error) =
                main_window::create_main_window(&app_handle, entry_url.clone(), restore_pending)
            {
                abort_window_start(&error);
            }
            startup_task::spawn_startup_task(app_handle, append_startup_log);
            Ok(())
        });

    let app = match builder.build(tauri::generate_context!()) {
        Ok(app) => app,
        Err(error) => abort_window_start(&error),
    };

    app.run(|app_handle, event| match event {
        RunEvent::ExitRequested { api, .. } => {
            exit_events::handle_exit_requested(app_handle, &api);
        }
        RunEvent::Exit => {
            exit_events::handle_exit_event(app_handle);
        }
        _ => {}
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_failure_names_the_underlying_error() {
        let error = "Failed to create main window: no display".to_string();
        assert_eq!(
            window_start_failure(&error),
            "Failed to start application window: Failed to create main window: no display"
        );
    }

    #[test]
    fn startup_inputs_are_empty_without_a_data_dir() {
        let base = tempfile::tempdir().expect("create base dir");
        let paths = RuntimePaths::resolve_with(None, Some(base.path().to_path_buf()), None, false);
        std::fs::create_dir_all(paths.data_dir()).expect("create data dir");
        std::fs::write(paths.dataset_path(), "{}").expect("write dataset");

        let inputs = load_startup_inputs(&paths, false);
        assert!(inputs.dataset.is_none());
        assert!(inputs.user_data.is_none());

        let inputs = load_startup_inputs(&paths, true);
        assert!(inputs.dataset.is_some());
    }
}
