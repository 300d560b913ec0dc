use std::{fs, path::Path};

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use url::Url;

use crate::{
    page_scripts, runtime_paths::RuntimePaths, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, MAIN_WINDOW_LABEL,
    MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, WINDOW_TITLE,
};

/// Names of the entries in `dir`, sorted, or a description of why the
/// directory could not be listed.
pub(crate) fn describe_dir_contents(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return vec![format!("(directory {} does not exist)", dir.display())];
    }
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            if names.is_empty() {
                names.push("(empty)".to_string());
            }
            names
        }
        Err(error) => vec![format!(
            "(could not list {}: {})",
            dir.display(),
            error
        )],
    }
}

/// Checks that the bundled entry page exists and returns its `file://` URL.
/// The error carries a multi-line diagnostic meant for the console.
pub(crate) fn verify_entry_page(paths: &RuntimePaths) -> Result<Url, String> {
    let entry_page = paths.entry_page();
    if !entry_page.is_file() {
        let mut lines = vec![
            format!("index.html not found at {}", entry_page.display()),
            format!("static dir: {}", paths.static_dir.display()),
            format!("base dir: {}", paths.base_dir.display()),
        ];
        if let Some(exe_dir) = &paths.exe_dir {
            lines.push(format!("executable dir: {}", exe_dir.display()));
        }
        lines.push(format!("contents of {}:", paths.static_dir.display()));
        lines.extend(
            describe_dir_contents(&paths.static_dir)
                .into_iter()
                .map(|name| format!("  - {name}")),
        );
        lines.push("cannot start application without index.html".to_string());
        return Err(lines.join("\n"));
    }

    entry_page_url(&entry_page)
}

pub(crate) fn entry_page_url(entry_page: &Path) -> Result<Url, String> {
    let absolute = entry_page.canonicalize().map_err(|error| {
        format!(
            "Failed to resolve entry page {}: {}",
            entry_page.display(),
            error
        )
    })?;
    Url::from_file_path(&absolute)
        .map_err(|_| format!("Entry page path is not absolute: {}", absolute.display()))
}

/// Script run in every document before the page's own scripts. Only needed
/// when a backup will be restored, so the page waits for it.
pub(crate) fn initialization_script(restore_pending: bool) -> Option<String> {
    restore_pending.then(page_scripts::install_restore_promise_script)
}

pub(crate) fn create_main_window(
    app_handle: &AppHandle,
    url: Url,
    restore_pending: bool,
) -> Result<WebviewWindow, String> {
    let mut builder =
        WebviewWindowBuilder::new(app_handle, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
            .title(WINDOW_TITLE)
            .inner_size(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)
            .min_inner_size(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT)
            .resizable(true);
    if let Some(script) = initialization_script(restore_pending) {
        builder = builder.initialization_script(&script);
    }
    builder
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))
}

pub(crate) fn show_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("show_main_window skipped: main window not found");
        return;
    };

    if let Err(error) = window.unminimize() {
        log(&format!("failed to unminimize main window: {error}"));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show main window: {error}"));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus main window: {error}"));
    }
}
