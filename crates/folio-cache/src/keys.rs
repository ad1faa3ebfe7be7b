//! Cache key namespace.
//!
//! | Key | Value |
//! |-----|-------|
//! | `page:<path>` | one document |
//! | `pages:all` | every document |
//! | `folders:all` | every folder path |
//! | `folder_pages:<folder>` | documents directly in one folder |

use glob::Pattern;

/// Every document.
pub const ALL_PAGES: &str = "pages:all";

/// Every folder path.
pub const ALL_FOLDERS: &str = "folders:all";

/// Matches all documents-in-folder lists.
pub const FOLDER_PAGES_PATTERN: &str = "folder_pages:*";

/// Key of one document.
#[must_use]
pub fn page(path: &str) -> String {
    format!("page:{path}")
}

/// Key of the documents-in-folder list (`""` is the root).
#[must_use]
pub fn folder_pages(folder: &str) -> String {
    format!("folder_pages:{folder}")
}

/// Pattern matching every document below a folder, at any depth.
///
/// Glob metacharacters in the folder name are escaped.
#[must_use]
pub fn pages_below(folder: &str) -> String {
    format!("page:{}/*", Pattern::escape(folder))
}
