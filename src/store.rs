//! Durable key/value file backing the proxy pool.
//!
//! The file is a flat JSON object of string keys to string values. Writes go to
//! a sibling `.tmp` file which is then renamed over the original, so readers
//! never observe a half-written pool.

use crate::error::{Error, Result};

use log::debug;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// An open pool file.
///
/// `put` is buffered until `close`; `delete` is written through immediately so
/// an eviction survives even if the handle is dropped without closing.
#[derive(Debug)]
pub struct PoolFile {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl PoolFile {
    /// Whether a pool file exists at `path`.
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Create an empty pool file, replacing any existing one.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::store(parent, e))?;
        }
        let file = Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
            dirty: false,
        };
        file.persist()?;
        Ok(file)
    }

    /// Open an existing pool file for reading and writing.
    ///
    /// I/O failures are `Error::Store`; undecodable content is `Error::Malformed`.
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::store(path, e))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| Error::Malformed(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    /// Delete the pool file. A missing file is not an error.
    pub fn remove(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed pool file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::store(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
        self.dirty = true;
    }

    /// Remove `key` and write the file. Returns whether the key was present.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let existed = self.entries.remove(key).is_some();
        if existed || self.dirty {
            self.persist()?;
            self.dirty = false;
        }
        Ok(existed)
    }

    /// All keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flush buffered writes and release the handle.
    pub fn close(mut self) -> Result<()> {
        if self.dirty {
            self.persist()?;
            self.dirty = false;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let body =
            serde_json::to_vec(&self.entries).map_err(|e| Error::store(&self.path, e.into()))?;
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).map_err(|e| Error::store(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::store(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_put_close_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        assert!(!PoolFile::exists(&path));

        let mut file = PoolFile::create(&path).unwrap();
        assert!(PoolFile::exists(&path));
        file.put("1.2.3.4:8080", "alive");
        file.put("5.6.7.8:3128", "alive");
        file.close().unwrap();

        let file = PoolFile::open(&path).unwrap();
        let keys: Vec<&str> = file.keys().collect();
        assert_eq!(keys, vec!["1.2.3.4:8080", "5.6.7.8:3128"]);
        assert_eq!(file.get("1.2.3.4:8080"), Some("alive"));
        assert_eq!(file.get("9.9.9.9:80"), None);
    }

    #[test]
    fn delete_is_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        let mut file = PoolFile::create(&path).unwrap();
        file.put("a.b:1", "alive");
        file.put("c.d:2", "alive");
        file.close().unwrap();

        let mut file = PoolFile::open(&path).unwrap();
        assert!(file.delete("a.b:1").unwrap());
        assert!(!file.delete("a.b:1").unwrap());
        drop(file);

        let file = PoolFile::open(&path).unwrap();
        assert_eq!(file.len(), 1);
        assert_eq!(file.get("c.d:2"), Some("alive"));
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(matches!(PoolFile::open(&path), Err(Error::Malformed(_))));
    }

    #[test]
    fn missing_file_is_store_error_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(matches!(PoolFile::open(&path), Err(Error::Store { .. })));
        PoolFile::remove(&path).unwrap();
    }
}
