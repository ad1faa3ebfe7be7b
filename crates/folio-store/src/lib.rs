//! Store composition for the Folio wiki.
//!
//! This crate layers behavior over the backends of `folio-storage-fs` and
//! `folio-storage-github`:
//! - [`CachedStore`]: read-through, write-through cache over any [`Store`]
//! - [`DualWriteStore`]: local reads with writes mirrored to a remote, plus sync
//! - [`FolderTree`]: navigation tree built from a store's folders and documents
//! - [`open_store`]: the store for the configured storage mode
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use folio_config::Config;
//! use folio_storage::Store;
//! use folio_store::{folder_tree, open_store};
//!
//! let config = Config::load(None)?;
//! let store = open_store(&config)?;
//!
//! let tree = folder_tree(store.as_ref(), "notes/todo")?;
//! store.sync()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Store`]: folio_storage::Store

mod cache;
mod cached;
mod dual;
mod open;
mod tree;

pub use cache::DocumentCache;
pub use cached::CachedStore;
pub use dual::{DualWriteStore, SyncReport};
pub use open::{OpenError, open_cache, open_store};
pub use tree::{FolderTree, FolderTreeItem, folder_children, folder_tree};
