//! Logical path handling shared by all backends.
//!
//! Logical paths use `/` separators and never carry the storage suffix.
//! Backends persist documents as `<folder>/.../<title>.txt`; remote backends
//! mark otherwise-empty folders with a `<folder>/.folder` sentinel file.

use crate::storage::{StorageError, StorageErrorKind};

/// Suffix appended to every persisted document.
pub const DOCUMENT_SUFFIX: &str = ".txt";

/// Sentinel file name marking a folder on backends without empty directories.
pub const FOLDER_MARKER: &str = ".folder";

/// Content written into [`FOLDER_MARKER`] files.
pub const FOLDER_MARKER_BODY: &str =
    "This file marks the folder for the wiki system. Please do not delete.";

/// Storage path for a document: the final segment gets [`DOCUMENT_SUFFIX`] if missing.
///
/// ```
/// use folio_storage::path::with_suffix;
///
/// assert_eq!(with_suffix("notes/todo"), "notes/todo.txt");
/// assert_eq!(with_suffix("/notes/todo.txt"), "notes/todo.txt");
/// ```
#[must_use]
pub fn with_suffix(path: &str) -> String {
    let path = path.trim_matches('/');
    if path.ends_with(DOCUMENT_SUFFIX) {
        path.to_owned()
    } else {
        format!("{path}{DOCUMENT_SUFFIX}")
    }
}

/// Logical path for a document: [`DOCUMENT_SUFFIX`] removed if present.
#[must_use]
pub fn strip_suffix(path: &str) -> &str {
    path.strip_suffix(DOCUMENT_SUFFIX).unwrap_or(path)
}

/// Last segment of a path, without the suffix.
#[must_use]
pub fn title_of(path: &str) -> &str {
    let path = strip_suffix(path.trim_end_matches('/'));
    path.rsplit_once('/').map_or(path, |(_, last)| last)
}

/// Folder part of a path ("" for root-level entries).
#[must_use]
pub fn parent_of(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map_or("", |(parent, _)| parent)
}

/// Join a folder and a title into a logical path.
#[must_use]
pub fn join(folder: &str, title: &str) -> String {
    let folder = normalize_folder(folder);
    if folder.is_empty() {
        title.to_owned()
    } else {
        format!("{folder}/{title}")
    }
}

/// Folder path without leading or trailing separators.
#[must_use]
pub fn normalize_folder(path: &str) -> &str {
    path.trim_matches('/')
}

/// Storage path of a folder's sentinel file.
#[must_use]
pub fn marker_path(folder: &str) -> String {
    join(folder, FOLDER_MARKER)
}

/// Reject paths that could escape the store root.
///
/// # Errors
///
/// Returns [`StorageErrorKind::InvalidArgument`] for `..` or `.` segments and
/// backslashes.
pub fn validate(path: &str) -> Result<(), StorageError> {
    let bad_segment = path.split('/').any(|s| s == ".." || s == ".");
    if bad_segment || path.contains('\\') {
        return Err(StorageError::new(StorageErrorKind::InvalidArgument)
            .with_message("path must not contain '.', '..' or '\\' segments")
            .with_path(path));
    }
    Ok(())
}

/// Nesting level of a folder: `"a"` is 1, `"a/b"` is 2, the root is 0.
#[must_use]
pub fn folder_depth(path: &str) -> usize {
    let path = normalize_folder(path);
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

/// Enforce the configured folder nesting limit.
///
/// Stores never call this; it is the caller's policy.
///
/// # Errors
///
/// Returns [`StorageErrorKind::InvalidArgument`] when `path` is deeper than `max_depth`.
pub fn check_folder_depth(path: &str, max_depth: usize) -> Result<(), StorageError> {
    let depth = folder_depth(path);
    if depth > max_depth {
        return Err(StorageError::invalid_argument(format!(
            "folder nesting depth {depth} exceeds the maximum of {max_depth}"
        ))
        .with_path(path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_suffix_appends_once() {
        assert_eq!(with_suffix("todo"), "todo.txt");
        assert_eq!(with_suffix("todo.txt"), "todo.txt");
        assert_eq!(with_suffix("a/b/todo"), "a/b/todo.txt");
    }

    #[test]
    fn test_with_suffix_only_touches_final_segment() {
        assert_eq!(with_suffix("v1.txt/notes"), "v1.txt/notes.txt");
    }

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_suffix("a/todo.txt"), "a/todo");
        assert_eq!(strip_suffix("a/todo"), "a/todo");
    }

    #[test]
    fn test_title_of() {
        assert_eq!(title_of("todo"), "todo");
        assert_eq!(title_of("a/b/todo.txt"), "todo");
        assert_eq!(title_of(""), "");
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("todo"), "");
        assert_eq!(parent_of("a/b/todo"), "a/b");
        assert_eq!(parent_of("a/"), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "todo"), "todo");
        assert_eq!(join("notes/", "todo"), "notes/todo");
    }

    #[test]
    fn test_marker_path() {
        assert_eq!(marker_path("notes"), "notes/.folder");
        assert_eq!(marker_path("a/b"), "a/b/.folder");
    }

    #[test]
    fn test_validate_accepts_nested() {
        assert!(validate("a/b/c").is_ok());
        assert!(validate("").is_ok());
    }

    #[test]
    fn test_validate_rejects_parent_dir() {
        let err = validate("a/../../etc").unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::InvalidArgument);
    }

    #[test]
    fn test_validate_rejects_backslash() {
        assert!(validate("a\\b").is_err());
    }

    #[test]
    fn test_folder_depth() {
        assert_eq!(folder_depth(""), 0);
        assert_eq!(folder_depth("a"), 1);
        assert_eq!(folder_depth("/a/b/"), 2);
    }

    #[test]
    fn test_check_folder_depth() {
        assert!(check_folder_depth("a/b/c", 3).is_ok());

        let err = check_folder_depth("a/b/c/d", 3).unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::InvalidArgument);
    }
}
