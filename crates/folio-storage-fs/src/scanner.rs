//! Document and folder discovery by filesystem walking.
//!
//! This module separates the discovery phase (finding files) from the reading
//! phase (loading content). The Scanner only identifies files and directories,
//! returning lightweight references for `LocalStore` to process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use folio_storage::path::DOCUMENT_SUFFIX;

/// Reference to a document file.
///
/// Contains only file locations - no content is read at this stage.
#[derive(Debug, Clone)]
pub(crate) struct DocumentRef {
    /// Logical path (e.g., "todo", "notes/todo").
    pub logical_path: String,
    /// Path to the `.txt` file on disk.
    pub file_path: PathBuf,
}

/// Everything found under the base directory.
#[derive(Debug, Default)]
pub(crate) struct Listing {
    pub documents: Vec<DocumentRef>,
    /// Folder paths relative to the base directory, parents before children.
    pub folders: Vec<String>,
}

/// A directory that could not be read.
#[derive(Debug)]
pub(crate) struct ScanError {
    pub dir: PathBuf,
    pub source: io::Error,
}

impl ScanError {
    fn at(dir: &Path) -> impl FnOnce(io::Error) -> Self {
        let dir = dir.to_path_buf();
        move |source| Self { dir, source }
    }
}

/// Discovers documents and folders by walking the filesystem.
pub(crate) struct Scanner<'a> {
    base_dir: &'a Path,
}

impl<'a> Scanner<'a> {
    pub fn new(base_dir: &'a Path) -> Self {
        Self { base_dir }
    }

    /// Walk the whole tree.
    ///
    /// Returns an empty listing if the base directory doesn't exist.
    pub fn scan(&self) -> Result<Listing, ScanError> {
        let mut listing = Listing::default();
        if self.base_dir.exists() {
            Self::scan_directory(self.base_dir, "", true, &mut listing)?;
        }
        Ok(listing)
    }

    /// Document files directly inside one folder.
    ///
    /// A missing folder fails with [`io::ErrorKind::NotFound`].
    pub fn scan_folder(&self, folder: &str) -> Result<Vec<DocumentRef>, ScanError> {
        let dir = self.base_dir.join(folder);
        let mut listing = Listing::default();
        // An empty store has no base directory yet.
        if folder.is_empty() && !dir.exists() {
            return Ok(listing.documents);
        }
        Self::scan_directory(&dir, folder, false, &mut listing)?;
        Ok(listing.documents)
    }

    fn scan_directory(
        dir_path: &Path,
        prefix: &str,
        recursive: bool,
        listing: &mut Listing,
    ) -> Result<(), ScanError> {
        let entries = fs::read_dir(dir_path).map_err(ScanError::at(dir_path))?;

        // Collect entries with cached file_type to avoid repeated stat calls in sort.
        let mut entries = entries
            .map(|e| -> io::Result<_> {
                let e = e?;
                let is_dir = e.file_type()?.is_dir();
                let name = e.file_name().to_string_lossy().into_owned();
                Ok((e, is_dir, name))
            })
            .collect::<io::Result<Vec<_>>>()
            .map_err(ScanError::at(dir_path))?;
        entries.sort_by(|(_, _, a), (_, _, b)| a.cmp(b));

        for (entry, is_dir, name) in entries {
            // Skip hidden files/dirs (VCS metadata, folder markers)
            if name.starts_with('.') {
                continue;
            }

            let child = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };

            if is_dir {
                if !recursive {
                    continue;
                }
                listing.folders.push(child.clone());
                match Self::scan_directory(&entry.path(), &child, recursive, listing) {
                    Ok(()) => {}
                    // Removed while walking.
                    Err(e) if e.source.kind() == io::ErrorKind::NotFound => {
                        tracing::debug!(folder = %child, "Folder vanished during scan");
                        listing.folders.retain(|f| f != &child);
                    }
                    Err(e) => return Err(e),
                }
            } else if let Some(logical_path) = child.strip_suffix(DOCUMENT_SUFFIX) {
                listing.documents.push(DocumentRef {
                    logical_path: logical_path.to_owned(),
                    file_path: entry.path(),
                });
            }
        }
        Ok(())
    }
}
