//! Directory-backed terminal tier.
//!
//! Stores one file per key under a root directory. The key is hex encoded
//! into the file name so arbitrary keys map to portable names. Writes go to
//! a uniquely named temporary file that is then renamed over the target, so
//! a concurrent reader sees either the old or the new value, never a torn
//! one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::DirectoryLayerConfig;
use crate::error::{CacheError, Result};
use crate::layer::CacheLayer;

const ENTRY_EXTENSION: &str = "val";
const TEMP_EXTENSION: &str = "tmp";

/// A persistent tier that keeps every entry as a file.
#[derive(Debug)]
pub struct DirectoryLayer {
    name: String,
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl DirectoryLayer {
    /// Opens (and creates if needed) the tier's root directory.
    ///
    /// Fails when the directory cannot be created or is not a directory.
    pub fn open(config: DirectoryLayerConfig) -> Result<Self> {
        fs::create_dir_all(&config.root)?;
        if !config.root.is_dir() {
            return Err(CacheError::Unavailable {
                tier: config.name,
                reason: format!("{} is not a directory", config.root.display()),
            });
        }

        Ok(Self {
            name: config.name,
            root: config.root,
            temp_counter: AtomicU64::new(0),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut file_name = encode_key(key);
        file_name.push('.');
        file_name.push_str(ENTRY_EXTENSION);
        self.root.join(file_name)
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            "{}.{}.{}.{TEMP_EXTENSION}",
            encode_key(key),
            std::process::id(),
            seq
        ))
    }
}

fn encode_key(key: &str) -> String {
    key.bytes().map(|b| format!("{b:02x}")).collect()
}

impl CacheLayer for DirectoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let temp = self.temp_path(key);
        let write = (|| {
            let mut file = fs::File::create(&temp)?;
            file.write_all(value.as_bytes())?;
            file.sync_data()?;
            fs::rename(&temp, self.entry_path(key))
        })();

        if let Err(e) = write {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn len(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| {
                        entry.path().extension().and_then(|ext| ext.to_str())
                            == Some(ENTRY_EXTENSION)
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn open(dir: &Path) -> DirectoryLayer {
        DirectoryLayer::open(DirectoryLayerConfig::new("disk", dir)).expect("open directory tier")
    }

    #[test]
    fn test_encode_key_is_hex() {
        assert_eq!(encode_key("aZ"), "615a");
        assert_eq!(encode_key("../x"), "2e2e2f78");
    }

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let layer = open(dir.path());

        assert_eq!(layer.get("missing").unwrap(), None);
        layer.set("key", "value").unwrap();
        assert_eq!(layer.get("key").unwrap().as_deref(), Some("value"));
        layer.set("key", "other").unwrap();
        assert_eq!(layer.get("key").unwrap().as_deref(), Some("other"));
        assert_eq!(layer.len(), 1);

        assert!(layer.remove("key").unwrap());
        assert!(!layer.remove("key").unwrap());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        open(dir.path()).set("persisted", "yes").unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.get("persisted").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn test_open_on_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();

        assert!(DirectoryLayer::open(DirectoryLayerConfig::new("disk", &file)).is_err());
    }
}
