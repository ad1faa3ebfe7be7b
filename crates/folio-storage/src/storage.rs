//! Store trait, document type, and error types.
//!
//! Provides the core [`Store`] trait for reading and mutating wiki documents and
//! folders, along with [`StorageError`] for unified error handling across backends.
//!
//! # Logical Path Convention
//!
//! All path parameters in Store methods are **logical paths**, not file paths:
//! - `"welcome"` - document at the root
//! - `"notes/todo"` - document inside folder `notes`
//! - `"notes"` - folder (for folder operations)
//! - `""` - root folder (for [`Store::documents_in_folder`])
//!
//! Backends append their storage suffix (see [`crate::path`]) when persisting.
//! Documents returned to callers never carry the suffix.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::path;

/// Number of characters kept in [`Document::preview`].
pub const PREVIEW_CHARS: usize = 150;

/// A wiki page.
///
/// `title` is always the last segment of `path`. Both are suffix-free.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Leaf name (e.g., "todo" for "notes/todo").
    pub title: String,
    /// Logical path (e.g., "notes/todo").
    pub path: String,
    /// Raw content bytes.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// First [`PREVIEW_CHARS`] characters of the content, set on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Modification time as seconds since Unix epoch, when the backend knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
    /// Path the document was loaded from, set when renaming.
    ///
    /// [`Store::update_document`] compares it with `path` to detect a rename.
    #[serde(skip)]
    pub previous_path: Option<String>,
}

impl Document {
    /// Create a document at a logical path.
    ///
    /// A trailing storage suffix on `path` is dropped and the title is derived
    /// from the last segment.
    #[must_use]
    pub fn new(path: &str, body: impl Into<Vec<u8>>) -> Self {
        let path = path::strip_suffix(path.trim_matches('/')).to_owned();
        Self {
            title: path::title_of(&path).to_owned(),
            path,
            body: body.into(),
            preview: None,
            last_modified: None,
            previous_path: None,
        }
    }

    /// Content as a string (lossy UTF-8).
    #[must_use]
    pub fn content(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Attach a preview generated from the content.
    #[must_use]
    pub fn with_preview(mut self) -> Self {
        self.preview = Some(preview_of(&self.content()));
        self
    }

    /// Attach a modification time.
    #[must_use]
    pub fn with_last_modified(mut self, secs: u64) -> Self {
        self.last_modified = Some(secs);
        self
    }

    /// Move the document to `new_path`, remembering where it came from.
    ///
    /// Passing the result to [`Store::update_document`] replaces the document
    /// at the old path with one at the new path.
    #[must_use]
    pub fn renamed(mut self, new_path: &str) -> Self {
        let old_path = std::mem::take(&mut self.path);
        let moved = Self::new(new_path, std::mem::take(&mut self.body));
        Self {
            previous_path: Some(old_path),
            ..moved
        }
    }

    /// Whether the document was renamed away from its stored path.
    #[must_use]
    pub fn rename_source(&self) -> Option<&str> {
        self.previous_path
            .as_deref()
            .map(path::strip_suffix)
            .filter(|old| *old != self.path)
    }

    /// Folder containing this document ("" for the root).
    #[must_use]
    pub fn folder(&self) -> &str {
        path::parent_of(&self.path)
    }
}

/// Build a preview: the first [`PREVIEW_CHARS`] characters, with an ellipsis if cut.
#[must_use]
pub fn preview_of(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

mod body_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Document or folder does not exist.
    NotFound,
    /// Empty title, path or content, or a path escaping the store.
    InvalidArgument,
    /// The backend refused a write against the current state (stale or missing version token).
    Conflict,
    /// Credentials were rejected.
    Unauthorized,
    /// Credentials lack permission.
    Forbidden,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Too many requests.
    RateLimited,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum ErrorStatus {
    /// Don't retry (not found, invalid argument, credentials).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (rate limited, service unavailable).
    Persistent,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "GitHub").
    pub backend: Option<&'static str>,
    /// What the operator can do about it.
    pub hint: Option<&'static str>,
    message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            path: None,
            backend: None,
            hint: None,
            message: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach a remediation hint.
    #[must_use]
    pub fn with_hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Attach a short description.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// True for [`StorageErrorKind::NotFound`].
    ///
    /// Handlers use this to answer 404 instead of 500.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_path(path)
    }

    /// Create an invalid argument error with a description.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::InvalidArgument).with_message(message)
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::Forbidden,
            std::io::ErrorKind::AlreadyExists => StorageErrorKind::Conflict,
            std::io::ErrorKind::InvalidInput => StorageErrorKind::InvalidArgument,
            std::io::ErrorKind::TimedOut => StorageErrorKind::Timeout,
            _ => StorageErrorKind::Other,
        };
        let status = match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => {
                ErrorStatus::Temporary
            }
            _ => ErrorStatus::Permanent,
        };
        let mut error = Self::new(kind).with_status(status).with_source(err);
        if let Some(p) = path {
            error = error.with_path(p);
        }
        error
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message: source (path: notes/todo) hint"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::InvalidArgument => "Invalid argument",
            StorageErrorKind::Conflict => "Conflict",
            StorageErrorKind::Unauthorized => "Unauthorized",
            StorageErrorKind::Forbidden => "Forbidden",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::RateLimited => "Rate limited",
            StorageErrorKind::Timeout => "Timeout",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        if let Some(hint) = self.hint {
            write!(f, ". {hint}")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Reject documents that no backend can persist.
///
/// # Errors
///
/// Returns [`StorageErrorKind::InvalidArgument`] for an empty path or title, or
/// a path that fails [`path::validate`].
pub fn validate_document(doc: &Document) -> Result<(), StorageError> {
    if doc.path.is_empty() {
        return Err(StorageError::invalid_argument("document path cannot be empty"));
    }
    if doc.title.is_empty() {
        return Err(
            StorageError::invalid_argument("document title cannot be empty").with_path(&doc.path),
        );
    }
    path::validate(&doc.path)
}

/// Unified document and folder store.
///
/// Implemented by each backend and by the decorators composed over them. All
/// operations are synchronous and may block on disk or network I/O.
/// Implementations are safe to share across threads but provide no
/// mutual exclusion between operations on the same path.
///
/// # Logical Paths
///
/// All path parameters are **logical paths** without the backend suffix:
/// - `"welcome"` - document at the root
/// - `"notes/todo"` - nested document
/// - `""` - root folder (folder queries only)
pub trait Store: Send + Sync {
    /// All documents, recursively, regardless of folder.
    fn list_documents(&self) -> Result<Vec<Document>, StorageError>;

    /// Read one document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if the document doesn't exist.
    fn get_document(&self, path: &str) -> Result<Document, StorageError>;

    /// Create a document, creating parent folders implicitly.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidArgument`] for an empty path or title
    /// (and, on remote backends, empty content).
    fn create_document(&self, doc: &Document) -> Result<(), StorageError>;

    /// Update a document, falling back to create when it doesn't exist.
    ///
    /// When [`Document::rename_source`] is set, the document at the old path
    /// is replaced by one at `doc.path`.
    fn update_document(&self, doc: &Document) -> Result<(), StorageError>;

    /// Delete one document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if the document doesn't exist.
    fn delete_document(&self, path: &str) -> Result<(), StorageError>;

    /// All folder paths, recursively. Never includes the root.
    fn list_folders(&self) -> Result<Vec<String>, StorageError>;

    /// Create a folder and any missing ancestors.
    fn create_folder(&self, path: &str) -> Result<(), StorageError>;

    /// Delete a folder and everything in it.
    ///
    /// Documents are removed one at a time; the first failure aborts and
    /// leaves the folder partially deleted.
    fn delete_folder(&self, path: &str) -> Result<(), StorageError>;

    /// Documents directly inside one folder (not recursive), with previews.
    ///
    /// `""` is the root folder.
    fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError>;

    /// Drop derived listings held by a caching layer.
    ///
    /// Handlers call this after structural changes. Backends without a cache
    /// do nothing.
    fn invalidate_cache(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Reconcile the backends behind this store.
    ///
    /// A single backend has nothing to reconcile and does nothing.
    fn sync(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Forward every [`Store`] method through a smart pointer, defaults included.
macro_rules! forward_store {
    ($($ptr:ident),+) => {$(
        impl<S: Store + ?Sized> Store for $ptr<S> {
            fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
                (**self).list_documents()
            }
            fn get_document(&self, path: &str) -> Result<Document, StorageError> {
                (**self).get_document(path)
            }
            fn create_document(&self, doc: &Document) -> Result<(), StorageError> {
                (**self).create_document(doc)
            }
            fn update_document(&self, doc: &Document) -> Result<(), StorageError> {
                (**self).update_document(doc)
            }
            fn delete_document(&self, path: &str) -> Result<(), StorageError> {
                (**self).delete_document(path)
            }
            fn list_folders(&self) -> Result<Vec<String>, StorageError> {
                (**self).list_folders()
            }
            fn create_folder(&self, path: &str) -> Result<(), StorageError> {
                (**self).create_folder(path)
            }
            fn delete_folder(&self, path: &str) -> Result<(), StorageError> {
                (**self).delete_folder(path)
            }
            fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError> {
                (**self).documents_in_folder(path)
            }
            fn invalidate_cache(&self) -> Result<(), StorageError> {
                (**self).invalidate_cache()
            }
            fn sync(&self) -> Result<(), StorageError> {
                (**self).sync()
            }
        }
    )+};
}

forward_store!(Arc, Box);
