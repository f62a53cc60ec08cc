use crate::{
    ActivityEntry, BatchId, BulkOperation, FileFilter, ItemRef, Listing, NotificationId,
    SearchHits, SortKey, Timestamp, UploadId, UploadSource, UserPreferences,
};

/// Single-item mutations issued outside the bulk path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateFolder { name: String, parent: Option<String> },
    Rename { item: ItemRef, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Clock tick; drives notification expiry.
    Tick(Timestamp),
    /// Open a folder (`None` for the root).
    Navigate { folder: Option<String> },
    /// Re-fetch the current folder.
    Refresh,
    ListingLoaded {
        request_id: u64,
        folder: Option<String>,
        result: Result<Listing, String>,
    },
    SortChanged(SortKey),
    SortOrderToggled,
    FilterChanged(FileFilter),
    /// User picked a local file to upload into the current folder.
    UploadRequested {
        display_name: String,
        source: UploadSource,
    },
    /// Transport progress for one upload attempt.
    UploadProgress {
        task_id: UploadId,
        attempt: u32,
        percent: u8,
    },
    UploadFinished {
        task_id: UploadId,
        attempt: u32,
        result: Result<(), String>,
    },
    UploadRetryClicked(UploadId),
    UploadCancelClicked(UploadId),
    ClearCompletedUploads,
    /// User edited the search box.
    SearchInputChanged(String),
    SearchDebounceElapsed { generation: u64 },
    SearchResolved {
        token: u64,
        result: Result<SearchHits, String>,
    },
    SearchCleared,
    SelectionToggled(ItemRef),
    SelectAllClicked,
    DeselectAllClicked,
    BulkRequested(BulkOperation),
    BulkItemFinished {
        batch_id: BatchId,
        item: ItemRef,
        result: Result<(), String>,
    },
    CreateFolderSubmitted { name: String },
    RenameSubmitted { item: ItemRef, name: String },
    MutationFinished {
        request_id: u64,
        mutation: Mutation,
        result: Result<(), String>,
    },
    NotificationDismissed(NotificationId),
    PreferencesChanged(UserPreferences),
    /// Restore persisted settings and activity at start-up.
    RestorePersisted {
        preferences: UserPreferences,
        activity: Vec<ActivityEntry>,
    },
    ClearActivity,
    /// Stands in for engine events that no longer map to anything, such as a
    /// finished mutation the app has no record of.
    NoOp,
}
