//! GitHub contents API types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Kind of a repository entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    /// Symlinks and submodules, which the wiki ignores.
    #[serde(other)]
    Other,
}

/// One file or directory returned by the contents API.
///
/// Only includes fields that are actually used.
/// Serde ignores unknown fields like `url` and `_links`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentEntry {
    /// Leaf name.
    pub name: String,
    /// Path from the repository root.
    pub path: String,
    /// Git blob sha, the version token for conditional writes.
    pub sha: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Base64 content, present for single-file responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `base64` for inlined content, `none` for files over 1 MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl ContentEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }
}

/// Response of `GET /repos/{owner}/{repo}/contents/{path}`.
///
/// A file path yields an object, a directory path yields an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

/// Response of `GET /repos/{owner}/{repo}/git/blobs/{sha}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Blob {
    pub content: String,
    pub encoding: String,
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
pub(crate) struct PutRequest<'a> {
    pub message: &'a str,
    /// Base64-encoded new content.
    pub content: String,
    pub branch: &'a str,
    /// Required when replacing an existing file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

/// Body of `DELETE /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
pub(crate) struct DeleteRequest<'a> {
    pub message: &'a str,
    pub sha: &'a str,
    pub branch: &'a str,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Decode API base64, which is wrapped at 60 columns.
pub(crate) fn decode_content(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Git blob sha of `content`, as reported by the contents API.
///
/// Comparing it with [`ContentEntry::sha`] tells whether a write would change anything.
#[must_use]
pub fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}
