use std::time::Duration;

use crate::{
    ActivityEntry, BatchId, BulkOperation, ItemRef, Mutation, UploadStart, UploadId,
    UserPreferences,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadListing {
        request_id: u64,
        folder: Option<String>,
    },
    StartUpload(UploadStart),
    AbortUpload { task_id: UploadId },
    /// Replace the pending debounce timer with one for `generation`.
    ArmSearchDebounce { generation: u64, delay: Duration },
    CancelSearchDebounce,
    RunSearch { token: u64, query: String },
    RunBulkItem {
        batch_id: BatchId,
        operation: BulkOperation,
        item: ItemRef,
    },
    Mutate { request_id: u64, mutation: Mutation },
    PersistSettings {
        preferences: UserPreferences,
        activity: Vec<ActivityEntry>,
    },
}
