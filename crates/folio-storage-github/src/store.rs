//! [`Store`] implementation over a GitHub repository branch.

use folio_storage::path::{self, DOCUMENT_SUFFIX, FOLDER_MARKER, FOLDER_MARKER_BODY};
use folio_storage::{Document, StorageError, Store, validate_document};
use tracing::{debug, warn};

use crate::api::ContentsApi;
use crate::client::{GitHubClient, GitHubSettings};
use crate::error::{BACKEND, GitHubError};
use crate::types::{ContentEntry, Contents, blob_sha, decode_content};

/// Document store backed by the files of one repository branch.
///
/// Every mutation first fetches the current blob sha, which the API requires
/// for conditional updates and deletes. Create and update fall back to each
/// other depending on whether the file exists.
pub struct GitHubStore<A = GitHubClient> {
    api: A,
}

impl GitHubStore<GitHubClient> {
    /// Build a client and verify it can see the configured branch.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`StorageError`] (Unauthorized, NotFound, Unavailable, ...)
    /// when verification fails.
    pub fn connect(settings: GitHubSettings) -> Result<Self, StorageError> {
        let client = GitHubClient::new(settings);
        client.verify().map_err(StorageError::from)?;
        Ok(Self::new(client))
    }
}

impl<A: ContentsApi> GitHubStore<A> {
    /// Wrap an API implementation without verifying it.
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Underlying API implementation.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current blob sha of a file, `None` when it doesn't exist.
    fn current_sha(&self, repo_path: &str) -> Result<Option<String>, StorageError> {
        match self.api.get(repo_path) {
            Ok(Contents::File(entry)) => Ok(Some(entry.sha)),
            Ok(Contents::Directory(_)) => Err(wrap(
                GitHubError::UnexpectedEntry {
                    path: repo_path.to_owned(),
                    found: "directory",
                },
                repo_path,
            )),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(wrap(e, repo_path)),
        }
    }

    /// Entries of one directory, `None` when it doesn't exist.
    fn list_dir(&self, folder: &str) -> Result<Option<Vec<ContentEntry>>, StorageError> {
        match self.api.get(folder) {
            Ok(Contents::Directory(entries)) => Ok(Some(entries)),
            Ok(Contents::File(_)) => Err(wrap(
                GitHubError::UnexpectedEntry {
                    path: folder.to_owned(),
                    found: "file",
                },
                folder,
            )),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(wrap(e, folder)),
        }
    }

    fn fetch(&self, logical: &str) -> Result<Document, StorageError> {
        let repo_path = path::with_suffix(logical);
        let entry = match self.api.get(&repo_path).map_err(|e| wrap(e, &repo_path))? {
            Contents::File(entry) => entry,
            Contents::Directory(_) => {
                return Err(wrap(
                    GitHubError::UnexpectedEntry {
                        path: repo_path.clone(),
                        found: "directory",
                    },
                    &repo_path,
                ));
            }
        };

        let body = match (entry.encoding.as_deref(), entry.content) {
            (Some("base64") | None, Some(content)) => {
                decode_content(&content).map_err(|e| wrap(GitHubError::from(e), &repo_path))?
            }
            // Files over 1 MB are not inlined.
            (Some("none"), _) => {
                debug!(path = %repo_path, "Content not inlined, fetching blob");
                self.api.blob(&entry.sha).map_err(|e| wrap(e, &repo_path))?
            }
            (encoding, _) => {
                return Err(wrap(
                    GitHubError::UnsupportedEncoding {
                        path: repo_path.clone(),
                        encoding: encoding.unwrap_or("missing").to_owned(),
                    },
                    &repo_path,
                ));
            }
        };
        Ok(Document::new(logical, body).with_preview())
    }

    fn put_document(&self, doc: &Document, sha: Option<&str>) -> Result<(), StorageError> {
        let repo_path = path::with_suffix(&doc.path);
        let message = match sha {
            Some(_) => format!("Update page: {}", doc.path),
            None => format!("Create page: {}", doc.path),
        };
        self.api
            .put(&repo_path, &message, &doc.body, sha)
            .map_err(|e| wrap(e, &repo_path))
    }

    /// Logical paths of every document at or below `folder`.
    fn walk_documents(&self, folder: &str, out: &mut Vec<String>) -> Result<(), StorageError> {
        for entry in self.list_dir(folder)?.unwrap_or_default() {
            if entry.is_dir() {
                self.walk_documents(&entry.path, out)?;
            } else if entry.is_file()
                && let Some(logical) = entry.path.strip_suffix(DOCUMENT_SUFFIX)
            {
                out.push(logical.to_owned());
            }
        }
        Ok(())
    }

    fn walk_folders(&self, folder: &str, out: &mut Vec<String>) -> Result<(), StorageError> {
        for entry in self.list_dir(folder)?.unwrap_or_default() {
            if !entry.is_dir() {
                continue;
            }
            out.push(entry.path.clone());
            if let Err(e) = self.walk_folders(&entry.path, out) {
                warn!(folder = %entry.path, "Skipping unreadable folder: {e}");
            }
        }
        Ok(())
    }

    /// Delete every file below `folder`, children before parents.
    fn delete_tree(&self, folder: &str) -> Result<usize, StorageError> {
        let mut deleted = 0;
        for entry in self.list_dir(folder)?.unwrap_or_default() {
            if entry.is_dir() {
                deleted += self.delete_tree(&entry.path)?;
            } else if entry.is_file() {
                let message = match entry.path.strip_suffix(DOCUMENT_SUFFIX) {
                    Some(logical) => format!("Delete page: {logical}"),
                    None => format!("Delete file: {}", entry.path),
                };
                self.api
                    .delete(&entry.path, &message, &entry.sha)
                    .map_err(|e| wrap(e, &entry.path))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Attach path context to a converted API error.
fn wrap(err: GitHubError, path: &str) -> StorageError {
    StorageError::from(err).with_path(path)
}

fn reject_empty(doc: &Document) -> Result<(), StorageError> {
    validate_document(doc).map_err(|e| e.with_backend(BACKEND))?;
    if doc.body.is_empty() {
        return Err(StorageError::invalid_argument("document content cannot be empty")
            .with_path(&doc.path)
            .with_backend(BACKEND));
    }
    Ok(())
}

impl<A: ContentsApi> Store for GitHubStore<A> {
    fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        let mut paths = Vec::new();
        self.walk_documents("", &mut paths)?;
        paths.iter().map(|p| self.fetch(p)).collect()
    }

    fn get_document(&self, path: &str) -> Result<Document, StorageError> {
        let logical = path::strip_suffix(path.trim_matches('/'));
        path::validate(logical).map_err(|e| e.with_backend(BACKEND))?;
        self.fetch(logical)
    }

    fn create_document(&self, doc: &Document) -> Result<(), StorageError> {
        reject_empty(doc)?;
        match self.current_sha(&path::with_suffix(&doc.path))? {
            Some(_) => {
                debug!(path = %doc.path, "Document exists, updating instead");
                self.update_document(doc)
            }
            None => self.put_document(doc, None),
        }
    }

    fn update_document(&self, doc: &Document) -> Result<(), StorageError> {
        reject_empty(doc)?;
        if let Some(old) = doc.rename_source() {
            match self.delete_document(old) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => debug!(from = old, "Rename source already gone"),
                Err(e) => return Err(e),
            }
        }

        match self.current_sha(&path::with_suffix(&doc.path))? {
            None => self.put_document(doc, None),
            Some(sha) if sha == blob_sha(&doc.body) => {
                debug!(path = %doc.path, "Content unchanged, skipping commit");
                Ok(())
            }
            Some(sha) => self.put_document(doc, Some(&sha)),
        }
    }

    fn delete_document(&self, path: &str) -> Result<(), StorageError> {
        let logical = path::strip_suffix(path.trim_matches('/'));
        path::validate(logical).map_err(|e| e.with_backend(BACKEND))?;
        let repo_path = path::with_suffix(logical);

        let Some(sha) = self.current_sha(&repo_path)? else {
            return Err(StorageError::not_found(&repo_path).with_backend(BACKEND));
        };
        self.api
            .delete(&repo_path, &format!("Delete page: {logical}"), &sha)
            .map_err(|e| wrap(e, &repo_path))
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        let mut folders = Vec::new();
        self.walk_folders("", &mut folders)?;
        Ok(folders)
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let folder = path::normalize_folder(path);
        if folder.is_empty() {
            return Err(StorageError::invalid_argument("folder path cannot be empty")
                .with_backend(BACKEND));
        }
        path::validate(folder).map_err(|e| e.with_backend(BACKEND))?;

        let marker = path::marker_path(folder);
        self.api
            .put(
                &marker,
                &format!("Create folder: {folder}"),
                FOLDER_MARKER_BODY.as_bytes(),
                None,
            )
            .map_err(|e| wrap(e, &marker))
    }

    fn delete_folder(&self, path: &str) -> Result<(), StorageError> {
        let folder = path::normalize_folder(path);
        if folder.is_empty() {
            return Err(StorageError::invalid_argument("cannot delete the root folder")
                .with_backend(BACKEND));
        }
        path::validate(folder).map_err(|e| e.with_backend(BACKEND))?;

        if self.list_dir(folder)?.is_none() {
            return Err(StorageError::not_found(folder).with_backend(BACKEND));
        }
        let deleted = self.delete_tree(folder)?;
        debug!(folder, deleted, "Deleted folder");
        Ok(())
    }

    fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError> {
        let folder = path::normalize_folder(path);
        path::validate(folder).map_err(|e| e.with_backend(BACKEND))?;

        let Some(entries) = self.list_dir(folder)? else {
            return Ok(Vec::new());
        };
        entries
            .iter()
            .filter(|e| e.is_file() && e.name != FOLDER_MARKER)
            .filter_map(|e| e.path.strip_suffix(DOCUMENT_SUFFIX))
            .map(|logical| self.fetch(logical))
            .collect()
    }
}
