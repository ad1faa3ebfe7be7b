//! GitHub repository storage for the Folio wiki.
//!
//! [`GitHubStore`] implements [`Store`](folio_storage::Store) over the files
//! of one branch, using the repository contents REST API:
//!
//! ```text
//! {branch}/
//! +-- welcome.txt          # document "welcome"
//! +-- notes/
//!     +-- .folder          # marker, the API has no empty directories
//!     +-- todo.txt         # document "notes/todo"
//! ```
//!
//! Each mutation is one commit. The API only lists one directory level per
//! call, so recursive listings walk the tree.
//!
//! # Example
//!
//! ```ignore
//! use folio_storage::Store;
//! use folio_storage_github::{DEFAULT_API_URL, GitHubSettings, GitHubStore};
//!
//! let store = GitHubStore::connect(GitHubSettings {
//!     token: std::env::var("GITHUB_TOKEN")?,
//!     owner: "me".to_owned(),
//!     repository: "wiki".to_owned(),
//!     branch: "main".to_owned(),
//!     api_url: DEFAULT_API_URL.to_owned(),
//! })?;
//! let folders = store.list_folders()?;
//! ```

mod api;
mod client;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod store;
mod types;

pub use api::ContentsApi;
pub use client::{DEFAULT_API_URL, GitHubClient, GitHubSettings};
pub use error::GitHubError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryRepo;
pub use store::GitHubStore;
pub use types::{ContentEntry, Contents, EntryType, blob_sha};
