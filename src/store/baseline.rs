use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::diff::bitmap::Bitmap;
use crate::error::StoreError;
use crate::page::page_model::sanitize_name;

/// On-disk "last known good" capture per page.
///
/// Layout under `root`:
/// - `{key}.png`: the baseline
/// - `{key}_diff.png`: annotated diff from the most recent comparison
///
/// `key` is [`sanitize_name`] of the page name. Every write goes to a
/// temporary file in `root` and is renamed into place, so readers only ever
/// see a complete image.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    root: PathBuf,
}

impl BaselineStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::Io {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.png", sanitize_name(name)))
    }

    pub fn diff_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}_diff.png", sanitize_name(name)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.baseline_path(name).is_file()
    }

    pub fn load(&self, name: &str) -> Result<Bitmap, StoreError> {
        let path = self.baseline_path(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Io { path, source: e }
            }
        })?;
        Ok(Bitmap::decode(&bytes)?)
    }

    /// Replace the baseline for `name` with `bitmap`.
    pub fn commit(&self, name: &str, bitmap: &Bitmap) -> Result<PathBuf, StoreError> {
        let path = self.baseline_path(name);
        self.write_atomic(&path, &bitmap.encode_png()?)?;
        debug!("Committed baseline for '{}' at {}", name, path.display());
        Ok(path)
    }

    /// Write the annotated diff for `name` next to its baseline.
    pub fn save_diff(&self, name: &str, bitmap: &Bitmap) -> Result<PathBuf, StoreError> {
        let path = self.diff_path(name);
        self.write_atomic(&path, &bitmap.encode_png()?)?;
        Ok(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
