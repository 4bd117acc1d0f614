//! File-backed settings for host builds.
//!
//! Each key is stored as one file so modem contexts survive process restarts.
//! Uses `~/.lora-modem-hal/settings` by default; a key `a/b/c` lives in
//! `<root>/a/b/c.bin`.

use super::storage::{LoadVisitor, SettingsBackend, SettingsError, SliceReader};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const VALUE_EXTENSION: &str = "bin";

/// Get the default settings directory.
///
/// Returns `~/.lora-modem-hal/settings`
pub fn default_settings_dir() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".lora-modem-hal").join("settings"))
}

/// Settings store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileSettings {
    root: PathBuf,
}

impl FileSettings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Settings store at the default directory.
    pub fn open_default() -> io::Result<Self> {
        Ok(Self::new(default_settings_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.join(key).into_os_string();
        path.push(".");
        path.push(VALUE_EXTENSION);
        PathBuf::from(path)
    }

    /// Collect `(relative_key, file)` pairs below `dir`.
    fn collect_children(dir: &Path, prefix: &str, out: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let mut entries: Vec<_> = entries.collect::<Result<_, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = if prefix.is_empty() {
                stem.to_string()
            } else {
                format!("{}/{}", prefix, stem)
            };

            if entry.file_type()?.is_dir() {
                Self::collect_children(&path, &name, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some(VALUE_EXTENSION) {
                out.push((name, path));
            }
        }
        Ok(())
    }
}

impl SettingsBackend for FileSettings {
    fn init(&self) -> Result<(), SettingsError> {
        fs::create_dir_all(&self.root)?;
        info!("Settings stored in {:?}", self.root);
        Ok(())
    }

    fn save_one(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        let path = self.value_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, value)?;

        // Verify write by reading back
        let read_back = fs::read(&path)?;
        if read_back != value {
            return Err(SettingsError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Verification of {} failed: wrote {} bytes, read {} bytes",
                    key,
                    value.len(),
                    read_back.len()
                ),
            )));
        }
        Ok(())
    }

    fn load_subtree(&self, subtree: &str, visit: &mut LoadVisitor<'_>) -> Result<(), SettingsError> {
        let mut found = Vec::new();

        let own = self.value_path(subtree);
        if own.is_file() {
            found.push((String::new(), own));
        }
        Self::collect_children(&self.root.join(subtree), "", &mut found)?;

        if found.is_empty() {
            debug!("No settings stored under {}", subtree);
        }

        for (name, path) in found {
            let value = fs::read(&path).map_err(|e| SettingsError::Read {
                key: format!("{}/{}", subtree, name),
                reason: e.to_string(),
            })?;
            visit(&name, &mut SliceReader::new(&value))?;
        }
        Ok(())
    }
}
