use tauri::AppHandle;

use crate::main_window;

/// Brings the existing window forward when a second instance is launched.
pub fn focus_existing_instance<F>(app_handle: &AppHandle, args: &[String], log: F)
where
    F: Fn(&str),
{
    log(&format!(
        "second instance launched with {} argument(s); focusing existing window",
        args.len()
    ));
    main_window::show_main_window(app_handle, &log);
}
