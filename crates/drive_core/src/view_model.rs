use crate::{
    ActivityEntry, BulkReport, FileEntry, FolderEntry, ItemRef, Mutation, Notification,
    SearchHits, SearchPhase, UploadId, UploadStatus, UserPreferences, ViewOptions,
};

/// Result of the last single-item mutation, for callers that branch on it
/// (e.g. keeping a create-folder prompt open on failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub mutation: Mutation,
    pub result: Result<(), String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub folder: Option<String>,
    pub breadcrumb: Vec<String>,
    pub loading: bool,
    pub listing_error: Option<String>,
    pub view_options: ViewOptions,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
    pub uploads: Vec<UploadRowView>,
    pub upload_progress: f64,
    pub uploads_active: bool,
    pub search: SearchView,
    pub selected: Vec<ItemRef>,
    pub bulk_in_flight: usize,
    pub last_bulk_report: Option<BulkReport>,
    pub last_mutation: Option<MutationOutcome>,
    pub mutations_in_flight: usize,
    pub notifications: Vec<Notification>,
    pub preferences: UserPreferences,
    pub activity: Vec<ActivityEntry>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRowView {
    pub task_id: UploadId,
    pub name: String,
    pub status: UploadStatus,
    pub progress_percent: u8,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub query: String,
    pub phase: SearchPhase,
    pub pending: bool,
    pub hits: Option<SearchHits>,
}
