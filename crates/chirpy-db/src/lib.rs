pub mod chirps;
pub mod document;
pub mod tokens;
pub mod users;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::info;

use chirpy_types::{Result, StorageError};

pub use document::StoreDocument;

/// Flat-file store: the whole dataset lives in one JSON document that is
/// loaded, and for writes saved again, on every operation.
///
/// A single reader/writer lock serializes writers against each other and
/// against readers. Writers hold it for the full load-mutate-save cycle.
/// Only one process may use a given file.
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let db = Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        };

        // Fail at startup rather than on the first request if the file is damaged.
        let doc = db.load()?;

        info!(
            "Database opened at {} ({} users, {} chirps, {} revoked tokens)",
            path.display(),
            doc.users.len(),
            doc.chirps.len(),
            doc.revoked_refresh_tokens.len()
        );
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Owned snapshot of the current document.
    pub fn load(&self) -> Result<StoreDocument> {
        self.with_doc(|doc| Ok(doc.clone()))
    }

    /// Replace the whole document.
    pub fn save(&self, doc: &StoreDocument) -> Result<()> {
        let _guard = self.lock.write().map_err(|_| StorageError::LockPoisoned)?;
        document::write(&self.path, doc)?;
        Ok(())
    }

    /// Run a read-only closure against a freshly loaded document under the
    /// reader lock.
    pub fn with_doc<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StoreDocument) -> Result<T>,
    {
        let doc = {
            let _guard = self.lock.read().map_err(|_| StorageError::LockPoisoned)?;
            document::read(&self.path)?
        };
        f(&doc)
    }

    /// Load, mutate and save under the writer lock. Nothing is written when
    /// the closure fails.
    pub fn with_doc_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreDocument) -> Result<T>,
    {
        let _guard = self.lock.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut doc = document::read(&self.path)?;
        let out = f(&mut doc)?;
        document::write(&self.path, &doc)?;
        Ok(out)
    }
}
