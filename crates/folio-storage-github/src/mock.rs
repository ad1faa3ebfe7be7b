//! In-memory repository for testing.
//!
//! Behaves like the contents API of a single branch: directories are implied
//! by file paths, every write is checked against the current blob sha, and
//! each commit message is recorded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, RwLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::api::ContentsApi;
use crate::error::GitHubError;
use crate::types::{ContentEntry, Contents, EntryType, blob_sha};

/// In-memory implementation of [`ContentsApi`].
#[derive(Debug, Default)]
pub struct MemoryRepo {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    commits: Mutex<Vec<String>>,
    failure: Mutex<Option<u16>>,
    requests: Mutex<usize>,
    inline_limit: Option<usize>,
}

impl MemoryRepo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a commit.
    #[must_use]
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files
            .write()
            .unwrap()
            .insert(path.to_owned(), content.into());
        self
    }

    /// Serve files larger than `limit` bytes without inline content, like the
    /// API does above 1 MB.
    #[must_use]
    pub fn with_inline_limit(mut self, limit: usize) -> Self {
        self.inline_limit = Some(limit);
        self
    }

    /// Make every following request fail with `status`.
    pub fn fail_with(&self, status: u16) {
        *self.failure.lock().unwrap() = Some(status);
    }

    /// Stop failing requests.
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Raw content of a file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// All file paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files.read().unwrap().keys().cloned().collect()
    }

    /// Commit messages in order.
    #[must_use]
    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    /// Number of API calls served so far, failed ones included.
    #[must_use]
    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    fn begin(&self) -> Result<(), GitHubError> {
        *self.requests.lock().unwrap() += 1;
        match *self.failure.lock().unwrap() {
            Some(status) => Err(GitHubError::status(status, "injected failure")),
            None => Ok(()),
        }
    }

    fn entry(path: &str, entry_type: EntryType, sha: String) -> ContentEntry {
        ContentEntry {
            name: path.rsplit('/').next().unwrap_or(path).to_owned(),
            path: path.to_owned(),
            sha,
            entry_type,
            content: None,
            encoding: None,
        }
    }
}

impl ContentsApi for MemoryRepo {
    fn get(&self, path: &str) -> Result<Contents, GitHubError> {
        self.begin()?;
        let path = path.trim_matches('/');
        let files = self.files.read().unwrap();

        if let Some(content) = files.get(path) {
            let mut entry = Self::entry(path, EntryType::File, blob_sha(content));
            if self.inline_limit.is_some_and(|limit| content.len() > limit) {
                entry.content = Some(String::new());
                entry.encoding = Some("none".to_owned());
            } else {
                entry.content = Some(STANDARD.encode(content));
                entry.encoding = Some("base64".to_owned());
            }
            return Ok(Contents::File(entry));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (file, content) in files.range(prefix.clone()..) {
            let Some(rest) = file.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(format!("{prefix}{dir}"));
                }
                None => entries.push(Self::entry(file, EntryType::File, blob_sha(content))),
            }
        }

        if entries.is_empty() && dirs.is_empty() && !path.is_empty() {
            return Err(GitHubError::status(404, "Not Found"));
        }
        entries.extend(
            dirs.into_iter()
                .map(|dir| Self::entry(&dir, EntryType::Dir, blob_sha(dir.as_bytes()))),
        );
        Ok(Contents::Directory(entries))
    }

    fn put(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        sha: Option<&str>,
    ) -> Result<(), GitHubError> {
        self.begin()?;
        let mut files = self.files.write().unwrap();

        if let Some(current) = files.get(path) {
            match sha {
                None => {
                    return Err(GitHubError::status(422, "\"sha\" wasn't supplied."));
                }
                Some(sha) if sha != blob_sha(current) => {
                    return Err(GitHubError::status(409, format!("{path} does not match {sha}")));
                }
                Some(_) => {}
            }
        }

        files.insert(path.to_owned(), content.to_vec());
        self.commits.lock().unwrap().push(message.to_owned());
        Ok(())
    }

    fn delete(&self, path: &str, message: &str, sha: &str) -> Result<(), GitHubError> {
        self.begin()?;
        let mut files = self.files.write().unwrap();

        let Some(current) = files.get(path) else {
            return Err(GitHubError::status(404, "Not Found"));
        };
        if sha != blob_sha(current) {
            return Err(GitHubError::status(409, format!("{path} does not match {sha}")));
        }

        files.remove(path);
        self.commits.lock().unwrap().push(message.to_owned());
        Ok(())
    }

    fn blob(&self, sha: &str) -> Result<Vec<u8>, GitHubError> {
        self.begin()?;
        self.files
            .read()
            .unwrap()
            .values()
            .find(|content| blob_sha(content) == sha)
            .cloned()
            .ok_or_else(|| GitHubError::status(404, "Not Found"))
    }
}
