use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    BASE_DIR_ENV, DATASET_FILE, DATA_DIR_NAME, DESKTOP_LOG_FILE, ENTRY_PAGE_FILE,
    README_PLACEHOLDER_FILE, STATIC_DIR_ENV, STATIC_DIR_NAME, USER_DATA_FILE,
};

const README_PLACEHOLDER_TEXT: &str = "Place your cells.json file in this folder.\n\
The cells.json file is required for the map to function properly.\n";

/// Where user data lives (`base_dir`) and where the bundled page lives
/// (`static_dir`). The two differ for installed bundles, where assets are
/// unpacked into a resource directory next to or inside the app bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuntimePaths {
    pub(crate) base_dir: PathBuf,
    pub(crate) static_dir: PathBuf,
    pub(crate) exe_dir: Option<PathBuf>,
}

impl RuntimePaths {
    pub(crate) fn resolve() -> Self {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::resolve_with(
            exe_dir,
            env_path(BASE_DIR_ENV),
            env_path(STATIC_DIR_ENV),
            cfg!(debug_assertions),
        )
    }

    pub(crate) fn resolve_with(
        exe_dir: Option<PathBuf>,
        base_override: Option<PathBuf>,
        static_override: Option<PathBuf>,
        dev_mode: bool,
    ) -> Self {
        let base_dir = base_override
            .or_else(|| dev_mode.then(workspace_root_dir))
            .or_else(|| exe_dir.clone())
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let base_dir = base_dir.canonicalize().unwrap_or(base_dir);

        let static_dir = static_override
            .unwrap_or_else(|| detect_static_dir(&base_dir, exe_dir.as_deref()));

        Self {
            base_dir,
            static_dir,
            exe_dir,
        }
    }

    pub(crate) fn data_dir(&self) -> PathBuf {
        self.base_dir.join(DATA_DIR_NAME)
    }

    pub(crate) fn entry_page(&self) -> PathBuf {
        self.static_dir.join(ENTRY_PAGE_FILE)
    }

    pub(crate) fn dataset_path(&self) -> PathBuf {
        self.data_dir().join(DATASET_FILE)
    }

    pub(crate) fn user_data_path(&self) -> PathBuf {
        self.data_dir().join(USER_DATA_FILE)
    }

    pub(crate) fn readme_placeholder_path(&self) -> PathBuf {
        self.data_dir().join(README_PLACEHOLDER_FILE)
    }

    pub(crate) fn desktop_log_path(&self) -> PathBuf {
        crate::logging::resolve_desktop_log_path(&self.data_dir(), DESKTOP_LOG_FILE)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn workspace_root_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    candidate.canonicalize().unwrap_or(candidate)
}

pub(crate) fn static_dir_candidates(base_dir: &Path, exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![base_dir.join(STATIC_DIR_NAME)];
    if let Some(exe_dir) = exe_dir {
        candidates.push(exe_dir.join(STATIC_DIR_NAME));
        candidates.push(exe_dir.join("resources").join(STATIC_DIR_NAME));
        candidates.push(exe_dir.join("..").join("Resources").join(STATIC_DIR_NAME));
        candidates.push(
            exe_dir
                .join("..")
                .join("lib")
                .join(env!("CARGO_PKG_NAME"))
                .join(STATIC_DIR_NAME),
        );
    }
    candidates
}

fn detect_static_dir(base_dir: &Path, exe_dir: Option<&Path>) -> PathBuf {
    static_dir_candidates(base_dir, exe_dir)
        .into_iter()
        .find(|candidate| candidate.join(ENTRY_PAGE_FILE).is_file())
        .unwrap_or_else(|| base_dir.join(STATIC_DIR_NAME))
}

/// Creates the data directory and the placeholder readme. Only the directory
/// is required; a placeholder failure is logged and ignored.
pub(crate) fn ensure_data_dir<F>(paths: &RuntimePaths, log: F) -> Result<PathBuf, String>
where
    F: Fn(&str),
{
    let data_dir = paths.data_dir();
    fs::create_dir_all(&data_dir).map_err(|error| {
        format!(
            "Failed to create data directory {}: {}",
            data_dir.display(),
            error
        )
    })?;

    let placeholder_path = paths.readme_placeholder_path();
    if placeholder_path.exists() {
        log(&format!("data folder already exists: {}", data_dir.display()));
        return Ok(data_dir);
    }

    match fs::write(&placeholder_path, README_PLACEHOLDER_TEXT) {
        Ok(()) => log(&format!(
            "created placeholder file: {}",
            placeholder_path.display()
        )),
        Err(error) => log(&format!(
            "failed to create placeholder file {}: {}",
            placeholder_path.display(),
            error
        )),
    }
    Ok(data_dir)
}
