//! Folder tree for navigation.
//!
//! Builds the sidebar tree from a flat folder list. Only the folders on the
//! way to the current path are expanded; the rest are collapsed and can be
//! fetched one level at a time with [`FolderTree::children_of`].
//!
//! Each level lists folders before documents, then sorts by name ignoring case.

use std::cmp::Ordering;

use folio_storage::{Document, StorageError, Store, path};
use serde::Serialize;

/// One node of the folder tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTreeItem {
    /// Last path segment.
    pub name: String,
    /// Logical path of the folder or document.
    pub path: String,
    /// Whether expanding would show anything.
    pub has_children: bool,
    /// Whether `children` is filled in.
    pub is_expanded: bool,
    /// Direct children, empty unless expanded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FolderTreeItem>,
    /// True for documents, false for folders.
    pub is_document: bool,
}

impl FolderTreeItem {
    fn folder(path: &str) -> Self {
        let name = path.rsplit_once('/').map_or(path, |(_, name)| name);
        Self {
            name: name.to_owned(),
            path: path.to_owned(),
            has_children: false,
            is_expanded: false,
            children: Vec::new(),
            is_document: false,
        }
    }

    fn document(doc: Document) -> Self {
        Self {
            name: doc.title,
            path: doc.path,
            has_children: false,
            is_expanded: false,
            children: Vec::new(),
            is_document: true,
        }
    }
}

/// Folders first, then case-insensitive name, then exact name for a stable order.
fn compare_items(a: &FolderTreeItem, b: &FolderTreeItem) -> Ordering {
    a.is_document
        .cmp(&b.is_document)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Tree builder over one snapshot of a store's folder list.
pub struct FolderTree<'a, S: ?Sized> {
    store: &'a S,
    folders: Vec<String>,
}

impl<'a, S: Store + ?Sized> FolderTree<'a, S> {
    /// Snapshot the folder list of `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when folders cannot be listed.
    pub fn load(store: &'a S) -> Result<Self, StorageError> {
        let folders = store.list_folders()?;
        Ok(Self { store, folders })
    }

    /// Folder paths in the snapshot.
    #[must_use]
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Root level of the tree with the folders leading to `current_path` expanded.
    ///
    /// `current_path` may name a folder or a document; `""` expands nothing.
    pub fn build(&self, current_path: &str) -> Result<Vec<FolderTreeItem>, StorageError> {
        let current = path::normalize_folder(current_path);
        self.level("", Some(current).filter(|c| !c.is_empty()))
    }

    /// Direct children of one folder, none of them expanded.
    pub fn children_of(&self, folder: &str) -> Result<Vec<FolderTreeItem>, StorageError> {
        self.level(path::normalize_folder(folder), None)
    }

    fn level(
        &self,
        parent: &str,
        current: Option<&str>,
    ) -> Result<Vec<FolderTreeItem>, StorageError> {
        let mut items = Vec::new();
        for folder in self.folders.iter().filter(|f| path::parent_of(f) == parent) {
            items.push(self.folder_item(folder, current)?);
        }
        items.extend(
            self.store
                .documents_in_folder(parent)?
                .into_iter()
                .map(FolderTreeItem::document),
        );
        items.sort_by(compare_items);
        Ok(items)
    }

    fn folder_item(
        &self,
        folder: &str,
        current: Option<&str>,
    ) -> Result<FolderTreeItem, StorageError> {
        let mut item = FolderTreeItem::folder(folder);
        let prefix = format!("{folder}/");

        if current.is_some_and(|c| c == folder || c.starts_with(&prefix)) {
            item.children = self.level(folder, current)?;
            item.has_children = !item.children.is_empty();
            item.is_expanded = true;
        } else {
            item.has_children =
                self.folders.iter().any(|f| f.starts_with(&prefix)) || self.has_documents(folder);
        }
        Ok(item)
    }

    fn has_documents(&self, folder: &str) -> bool {
        match self.store.documents_in_folder(folder) {
            Ok(docs) => !docs.is_empty(),
            Err(e) => {
                tracing::warn!(folder, error = %e, "Failed to list folder documents");
                false
            }
        }
    }
}

/// Root level of the folder tree, expanded towards `current_path`.
///
/// # Errors
///
/// Returns the store's error when folders or documents cannot be listed.
pub fn folder_tree<S: Store + ?Sized>(
    store: &S,
    current_path: &str,
) -> Result<Vec<FolderTreeItem>, StorageError> {
    FolderTree::load(store)?.build(current_path)
}

/// Direct children of one folder, for lazy expansion.
///
/// # Errors
///
/// Returns the store's error when folders or documents cannot be listed.
pub fn folder_children<S: Store + ?Sized>(
    store: &S,
    folder: &str,
) -> Result<Vec<FolderTreeItem>, StorageError> {
    FolderTree::load(store)?.children_of(folder)
}
