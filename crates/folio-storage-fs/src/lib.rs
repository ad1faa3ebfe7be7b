//! Local directory storage for the Folio wiki.
//!
//! This crate provides [`LocalStore`], a filesystem-based implementation of the
//! [`Store`](folio_storage::Store) trait. Layout under the base directory:
//!
//! ```text
//! {base}/
//! +-- welcome.txt          # document "welcome"
//! +-- notes/               # folder "notes" (exists because the directory does)
//!     +-- todo.txt         # document "notes/todo"
//! ```
//!
//! Folder creation is idempotent (`mkdir -p` semantics) and documents may
//! have empty content.
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use folio_storage::{Document, Store};
//! use folio_storage_fs::LocalStore;
//!
//! let store = LocalStore::new(PathBuf::from("data"));
//! store.create_document(&Document::new("notes/todo", "buy milk"))?;
//! ```

mod scanner;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use folio_storage::path;
use folio_storage::{Document, Store, StorageError, validate_document};
use scanner::{DocumentRef, ScanError, Scanner};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Create a storage error from an I/O error on `path`.
fn io_error(err: std::io::Error, path: &Path) -> StorageError {
    StorageError::io(err, Some(path.to_path_buf())).with_backend(BACKEND)
}

fn scan_error(err: ScanError) -> StorageError {
    io_error(err.source, &err.dir)
}

/// Filesystem store rooted at a base directory.
pub struct LocalStore {
    /// Root directory for documents and folders.
    base_dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `base_dir`.
    ///
    /// The directory is created lazily by the first write.
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Root directory of this store.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// On-disk location of a document.
    fn document_file(&self, logical: &str) -> Result<PathBuf, StorageError> {
        path::validate(logical).map_err(|e| e.with_backend(BACKEND))?;
        Ok(self.base_dir.join(path::with_suffix(logical)))
    }

    /// On-disk location of a folder.
    fn folder_dir(&self, folder: &str) -> Result<PathBuf, StorageError> {
        let folder = path::normalize_folder(folder);
        path::validate(folder).map_err(|e| e.with_backend(BACKEND))?;
        Ok(self.base_dir.join(folder))
    }

    /// Load a document from disk.
    fn load(logical: &str, file: &Path) -> Result<Document, StorageError> {
        let body = fs::read(file).map_err(|e| io_error(e, file))?;
        let mut doc = Document::new(logical, body).with_preview();
        if let Some(secs) = fs::metadata(file)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
        {
            doc = doc.with_last_modified(secs);
        }
        Ok(doc)
    }

    fn write(&self, doc: &Document) -> Result<(), StorageError> {
        validate_document(doc).map_err(|e| e.with_backend(BACKEND))?;
        let file = self.document_file(&doc.path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(e, parent))?;
        }
        fs::write(&file, &doc.body).map_err(|e| io_error(e, &file))?;
        tracing::debug!(path = %doc.path, bytes = doc.body.len(), "wrote local document");
        Ok(())
    }
}

impl Store for LocalStore {
    fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        Scanner::new(&self.base_dir)
            .scan()
            .map_err(scan_error)?
            .documents
            .iter()
            .map(|DocumentRef { logical_path, file_path }| Self::load(logical_path, file_path))
            .collect()
    }

    fn get_document(&self, path: &str) -> Result<Document, StorageError> {
        let logical = path::strip_suffix(path.trim_matches('/'));
        let file = self.document_file(logical)?;
        Self::load(logical, &file)
    }

    fn create_document(&self, doc: &Document) -> Result<(), StorageError> {
        self.write(doc)
    }

    fn update_document(&self, doc: &Document) -> Result<(), StorageError> {
        // New file first, so a failed write leaves the old one in place.
        self.write(doc)?;
        if let Some(old) = doc.rename_source() {
            match self.delete_document(old) {
                Ok(()) => tracing::debug!(from = old, to = %doc.path, "renamed local document"),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn delete_document(&self, path: &str) -> Result<(), StorageError> {
        let file = self.document_file(path::strip_suffix(path.trim_matches('/')))?;
        fs::remove_file(&file).map_err(|e| io_error(e, &file))
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        Ok(Scanner::new(&self.base_dir).scan().map_err(scan_error)?.folders)
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let dir = self.folder_dir(path)?;
        fs::create_dir_all(&dir).map_err(|e| io_error(e, &dir))
    }

    fn delete_folder(&self, path: &str) -> Result<(), StorageError> {
        let dir = self.folder_dir(path)?;
        if path::normalize_folder(path).is_empty() {
            return Err(StorageError::invalid_argument("cannot delete the root folder")
                .with_backend(BACKEND));
        }
        if !dir.is_dir() {
            return Err(StorageError::not_found(&dir).with_backend(BACKEND));
        }

        // Documents first, one at a time; the first failure aborts.
        for doc in Scanner::new(&dir).scan().map_err(scan_error)?.documents {
            fs::remove_file(&doc.file_path).map_err(|e| io_error(e, &doc.file_path))?;
        }
        fs::remove_dir_all(&dir).map_err(|e| io_error(e, &dir))
    }

    fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError> {
        let folder = path::normalize_folder(path);
        self.folder_dir(folder)?;
        let refs = Scanner::new(&self.base_dir)
            .scan_folder(folder)
            .map_err(scan_error)?;

        let mut documents = Vec::with_capacity(refs.len());
        for DocumentRef { logical_path, file_path } in refs {
            match Self::load(&logical_path, &file_path) {
                Ok(doc) => documents.push(doc),
                Err(e) => tracing::warn!(path = %logical_path, "skipping unreadable document: {e}"),
            }
        }
        Ok(documents)
    }
}
