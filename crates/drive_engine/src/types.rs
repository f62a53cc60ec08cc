use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    pub kind: FailureKind,
    pub message: String,
}

impl GatewayError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    /// 2xx response whose envelope said `success: false`.
    Rejected,
    Timeout,
    Network,
    Decode,
    Cancelled,
    LocalIo,
    Unsupported,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Rejected => write!(f, "rejected by server"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::LocalIo => write!(f, "local io error"),
            FailureKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Accepts either a bare id or a populated `{ "_id": ... }` object.
fn id_or_object<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reference {
        Id(String),
        Object {
            #[serde(rename = "_id")]
            id: String,
        },
    }

    Ok(Option::<Reference>::deserialize(deserializer)?.map(|reference| match reference {
        Reference::Id(id) | Reference::Object { id } => id,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "id_or_object")]
    pub folder: Option<String>,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days_remaining: Option<i64>,
    #[serde(default)]
    pub current_version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFolder {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "id_or_object")]
    pub parent_folder: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DriveContents {
    #[serde(default)]
    pub folders: Vec<RemoteFolder>,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    /// Filled by the engine from the breadcrumb endpoint.
    #[serde(skip)]
    pub breadcrumb: Vec<RemoteFolder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub folders: Vec<RemoteFolder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareStatus {
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub share_link: Option<String>,
    #[serde(default)]
    pub full_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub version_number: u32,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub(crate) struct VersionHistory {
    #[serde(default)]
    pub versions: Vec<FileVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiSource {
    #[serde(default)]
    pub text: String,
}

/// Generated answer plus the retrieved passages it was based on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<AiSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default, alias = "document")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagCount {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TypeUsage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestFile {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAnalytics {
    #[serde(default)]
    pub total_storage: u64,
    #[serde(default)]
    pub storage_limit: u64,
    #[serde(default)]
    pub storage_used_percent: f64,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub trash_count: u64,
    #[serde(default)]
    pub starred_count: u64,
    #[serde(default)]
    pub type_breakdown: BTreeMap<String, TypeUsage>,
    #[serde(default)]
    pub largest_files: Vec<LargestFile>,
    #[serde(default)]
    pub recent_uploads: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutoTags {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Preview payload; `url` is relative to the file host, `content` carries text bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilePreview {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// File metadata reachable through a public share link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Item addressed by a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    File(String),
    Folder(String),
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteTarget::File(id) => write!(f, "file {id}"),
            RemoteTarget::Folder(id) => write!(f, "folder {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    /// Save the file's bytes to `dest`.
    Download { dest: PathBuf },
    Trash,
    Delete,
    Star,
    Move { target: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ListingLoaded {
        request_id: u64,
        folder: Option<String>,
        result: Result<DriveContents, GatewayError>,
    },
    UploadProgress {
        task_id: u64,
        attempt: u32,
        percent: u8,
    },
    UploadFinished {
        task_id: u64,
        attempt: u32,
        result: Result<RemoteFile, GatewayError>,
    },
    DebounceElapsed {
        generation: u64,
    },
    SearchFinished {
        token: u64,
        result: Result<SearchResults, GatewayError>,
    },
    BulkItemFinished {
        batch_id: u64,
        target: RemoteTarget,
        result: Result<(), GatewayError>,
    },
    MutationFinished {
        request_id: u64,
        result: Result<(), GatewayError>,
    },
}
