//! Seam between the store logic and the contents REST API.

use crate::error::GitHubError;
use crate::types::Contents;

/// The contents API calls the store needs, scoped to one repository branch.
///
/// Paths are repository paths without leading `/`; `""` is the repository root.
/// Implemented by [`GitHubClient`](crate::GitHubClient) and, for tests, by
/// `MemoryRepo`.
pub trait ContentsApi: Send + Sync {
    /// Fetch a file (with content) or a directory listing (without content).
    fn get(&self, path: &str) -> Result<Contents, GitHubError>;

    /// Create a file, or replace it when `sha` names its current blob.
    fn put(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        sha: Option<&str>,
    ) -> Result<(), GitHubError>;

    /// Delete a file whose current blob is `sha`.
    fn delete(&self, path: &str, message: &str, sha: &str) -> Result<(), GitHubError>;

    /// Raw bytes of a blob, for files too large to be inlined by [`get`](Self::get).
    fn blob(&self, sha: &str) -> Result<Vec<u8>, GitHubError>;
}
