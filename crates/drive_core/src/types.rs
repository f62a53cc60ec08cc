use std::fmt;

use chrono::{DateTime, Utc};

/// A file or folder in a listing, addressed by its server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemRef {
    File(String),
    Folder(String),
}

impl ItemRef {
    pub fn id(&self) -> &str {
        match self {
            ItemRef::File(id) | ItemRef::Folder(id) => id,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, ItemRef::Folder(_))
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::File(id) => write!(f, "file:{id}"),
            ItemRef::Folder(id) => write!(f, "folder:{id}"),
        }
    }
}

/// Read-only projection of a server file. The server copy is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub extension: String,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
    pub starred: bool,
    pub tags: Vec<String>,
    pub folder: Option<String>,
    /// Server-side storage path, used as the content reference for AI calls.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Contents of one folder (or the root when `folder` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
    pub folder: Option<String>,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
    pub breadcrumb: Vec<FolderEntry>,
}

impl Listing {
    pub fn item_refs(&self) -> Vec<ItemRef> {
        self.folders
            .iter()
            .map(|folder| ItemRef::Folder(folder.id.clone()))
            .chain(self.files.iter().map(|file| ItemRef::File(file.id.clone())))
            .collect()
    }

    pub fn file(&self, id: &str) -> Option<&FileEntry> {
        self.files.iter().find(|file| file.id == id)
    }

    pub fn folder(&self, id: &str) -> Option<&FolderEntry> {
        self.folders.iter().find(|folder| folder.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchHits {
    pub files: Vec<FileEntry>,
    pub folders: Vec<FolderEntry>,
}
