use std::{fs, io::ErrorKind, path::Path};

/// Raw `cells.json` text. Handed to the page untouched; the page owns parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DatasetBlob(String);

impl DatasetBlob {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DatasetLoad {
    Loaded(DatasetBlob),
    Missing,
    Unreadable(String),
}

pub(crate) fn load_dataset(path: &Path) -> DatasetLoad {
    match fs::read_to_string(path) {
        Ok(text) => DatasetLoad::Loaded(DatasetBlob::new(text)),
        Err(error) if error.kind() == ErrorKind::NotFound => DatasetLoad::Missing,
        Err(error) => DatasetLoad::Unreadable(format!(
            "Failed to read dataset {}: {}",
            path.display(),
            error
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_dataset_reads_text_verbatim() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("cells.json");
        fs::write(&path, "{\"cells\": [1, 2]}\n").expect("write dataset");

        let DatasetLoad::Loaded(blob) = load_dataset(&path) else {
            panic!("dataset should load");
        };
        assert_eq!(blob, DatasetBlob::new("{\"cells\": [1, 2]}\n"));
        assert_eq!(blob.len(), 18);
    }

    #[test]
    fn load_dataset_reports_missing_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        assert_eq!(
            load_dataset(&dir.path().join("cells.json")),
            DatasetLoad::Missing
        );
    }

    #[test]
    fn load_dataset_reports_unreadable_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let load = load_dataset(dir.path());
        assert!(matches!(load, DatasetLoad::Unreadable(message) if message.contains("Failed to read dataset")));
    }
}
