//! Storage abstraction for the Folio wiki.
//!
//! This crate provides a [`Store`] trait for reading and mutating wiki pages
//! ("documents") and the folders that group them, independent of where they
//! live. This enables:
//!
//! - **Unit testing** without touching the real filesystem or network
//! - **Backend flexibility** (local directory, hosted Git repository)
//! - **Decoration** of any backend with caching or dual writes
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Store`] trait with document and folder CRUD plus `sync()` and `invalidate_cache()`
//! - [`Document`] and [`StorageError`] shared by all backends
//! - [`path`] helpers mapping logical paths to persisted paths
//! - [`MockStore`] for testing (behind `mock` feature flag)
//!
//! Backends live in sibling crates (`folio-storage-fs`, `folio-storage-github`).
//!
//! # Example
//!
//! ```ignore
//! use folio_storage::{Document, Store};
//!
//! store.create_document(&Document::new("notes/todo", "buy milk"))?;
//! for doc in store.documents_in_folder("notes")? {
//!     println!("{}: {}", doc.path, doc.preview.unwrap_or_default());
//! }
//! ```

#[cfg(feature = "mock")]
mod mock;
pub mod path;
mod storage;

#[cfg(feature = "mock")]
pub use mock::{MockOp, MockStore};
pub use storage::{
    Document, ErrorStatus, PREVIEW_CHARS, StorageError, StorageErrorKind, Store, preview_of,
    validate_document,
};
