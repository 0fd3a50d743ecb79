//! Writing record sets to disk

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::StoreError;
use crate::record::RecordSet;

/// `<dir>/<id>.json`, or the first free `<dir>/<id>_N.json` when taken.
pub fn available_path(dir: &Path, id: &str) -> PathBuf {
    let first = dir.join(format!("{id}.json"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{id}_{n}.json")))
        .find(|path| !path.exists())
        .unwrap_or(first)
}

/// Write the set as pretty JSON and return the path used.
pub fn write_record_set(
    dir: &Path,
    set: &RecordSet,
    overwrite: bool,
) -> Result<PathBuf, StoreError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StoreError::Io { path, source }
    };

    fs::create_dir_all(dir).map_err(io(dir))?;

    let path = if overwrite {
        dir.join(format!("{}.json", set.name))
    } else {
        available_path(dir, &set.name)
    };

    let json = serde_json::to_string_pretty(set)?;
    fs::write(&path, json).map_err(io(&path))?;

    info!(path = %path.display(), records = set.len(), "saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn set() -> RecordSet {
        RecordSet::new(
            "pnb",
            vec![Record::new(vec![
                ("Title_ID".to_string(), "PNB-001".to_string()),
                ("Province".to_string(), "Laguna".to_string()),
            ])],
        )
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_record_set(dir.path(), &set(), false).unwrap();

        assert_eq!(path, dir.path().join("pnb.json"));
        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["Province"], "Laguna");
        assert!(text.find("Title_ID").unwrap() < text.find("Province").unwrap());
    }

    #[test]
    fn test_existing_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_record_set(dir.path(), &set(), false).unwrap();
        let second = write_record_set(dir.path(), &set(), false).unwrap();
        let third = write_record_set(dir.path(), &set(), false).unwrap();

        assert_eq!(second, dir.path().join("pnb_1.json"));
        assert_eq!(third, dir.path().join("pnb_2.json"));
        assert!(first.exists());
    }

    #[test]
    fn test_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        write_record_set(dir.path(), &set(), false).unwrap();
        let path = write_record_set(dir.path(), &set(), true).unwrap();
        assert_eq!(path, dir.path().join("pnb.json"));
        assert!(!dir.path().join("pnb_1.json").exists());
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("banks");
        let path = write_record_set(&nested, &set(), false).unwrap();
        assert!(path.starts_with(&nested));
    }
}
