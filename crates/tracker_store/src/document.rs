use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracker_core::store::StoreSnapshot;
use tracker_core::StoreError;

pub const FORMAT_VERSION: u32 = 1;

/// On-disk layout of a tracker data file: a format version followed by the
/// snapshot fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub snapshot: StoreSnapshot,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

impl StoreDocument {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            version: FORMAT_VERSION,
            snapshot,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let document: StoreDocument = serde_json::from_str(raw)?;
        if document.version > FORMAT_VERSION {
            return Err(StoreError::Unavailable(format!(
                "data file version {} is newer than supported version {}",
                document.version, FORMAT_VERSION
            )));
        }
        Ok(document)
    }
}

/// Reads a data file. A missing file is not an error.
pub fn read(path: impl AsRef<Path>) -> Result<Option<StoreSnapshot>, StoreError> {
    let raw = match fs::read_to_string(path.as_ref()) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(StoreDocument::parse(&raw)?.snapshot))
}

/// Writes the whole snapshot next to `path` and renames it into place, so
/// readers never observe a half-written file.
pub fn write(path: impl AsRef<Path>, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(&StoreDocument::new(snapshot.clone()))?;
    let staging = staging_path(path);
    fs::write(&staging, raw)?;
    fs::rename(&staging, path)?;
    Ok(())
}

pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
