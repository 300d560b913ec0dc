use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};

use crate::USER_DATA_KEY_PREFIX;

/// Namespaced local storage entries mirrored to `user_data.json`.
///
/// Keys are kept sorted so the same snapshot always serializes to the same
/// bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UserDataSnapshot {
    entries: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PersistOutcome {
    Written,
    Unchanged,
}

impl UserDataSnapshot {
    /// Builds a snapshot from a JSON object, dropping keys outside the
    /// namespace. Returns the snapshot and the number of dropped keys.
    pub(crate) fn from_json_object(object: Map<String, Value>) -> (Self, usize) {
        let mut entries = BTreeMap::new();
        let mut dropped = 0;
        for (key, value) in object {
            if !key.starts_with(USER_DATA_KEY_PREFIX) {
                dropped += 1;
                continue;
            }
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            entries.insert(key, value);
        }
        (Self { entries }, dropped)
    }

    pub(crate) fn parse(raw: &str) -> Result<(Self, usize), String> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => Ok(Self::from_json_object(object)),
            Ok(_) => Err("user data is not a JSON object".to_string()),
            Err(error) => Err(format!("Failed to parse user data: {error}")),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub(crate) fn to_pretty_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|error| format!("Failed to serialize user data: {error}"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UserDataSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = iter
            .into_iter()
            .map(|(key, value)| (key.into(), Value::String(value.into())))
            .collect();
        Self::from_json_object(object).0
    }
}

/// Interprets the string the page returns from a pull. Blank, `{}` and
/// `null` results mean "nothing to save".
pub(crate) fn parse_pulled_snapshot(raw: &str) -> Result<Option<UserDataSnapshot>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "{}" || trimmed == "null" {
        return Ok(None);
    }

    let (snapshot, _) = UserDataSnapshot::parse(trimmed)?;
    if snapshot.is_empty() {
        return Ok(None);
    }
    Ok(Some(snapshot))
}

/// Reads a previous backup. A missing file is not an error.
pub(crate) fn load_user_data<F>(path: &Path, log: F) -> Result<Option<UserDataSnapshot>, String>
where
    F: Fn(&str),
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(format!(
                "Failed to read user data backup {}: {}",
                path.display(),
                error
            ));
        }
    };

    let (snapshot, dropped) = UserDataSnapshot::parse(&raw)
        .map_err(|error| format!("{} ({})", error, path.display()))?;
    if dropped > 0 {
        log(&format!(
            "ignored {dropped} user data keys outside the '{USER_DATA_KEY_PREFIX}' namespace"
        ));
    }
    if snapshot.is_empty() {
        return Ok(None);
    }
    Ok(Some(snapshot))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}

/// Writes the snapshot as indented JSON. The document is written to a
/// sibling temp file and renamed into place, so readers never observe a
/// partial file. Identical content is left untouched.
pub(crate) fn persist_user_data(
    path: &Path,
    snapshot: &UserDataSnapshot,
) -> Result<PersistOutcome, String> {
    let serialized = snapshot.to_pretty_json()?;

    if let Ok(existing) = fs::read_to_string(path) {
        if existing == serialized {
            return Ok(PersistOutcome::Unchanged);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create data directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, &serialized).map_err(|error| {
        format!(
            "Failed to write user data {}: {}",
            temp_path.display(),
            error
        )
    })?;
    fs::rename(&temp_path, path).map_err(|error| {
        let _ = fs::remove_file(&temp_path);
        format!(
            "Failed to move user data into place {}: {}",
            path.display(),
            error
        )
    })?;
    Ok(PersistOutcome::Written)
}
