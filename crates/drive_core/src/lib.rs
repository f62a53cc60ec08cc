//! Drive core: pure client state machine, coordinators and view-model helpers.
mod effect;
mod error;
pub mod format;
mod listing;
mod msg;
mod notify;
mod prefs;
mod search;
mod selection;
mod state;
mod types;
mod update;
mod upload;
mod view_model;

pub use effect::Effect;
pub use error::{CoordinatorError, ValidationError};
pub use listing::{
    filter_counts, project, FileFilter, Projection, SortKey, SortOrder, ViewMode, ViewOptions,
};
pub use msg::{Msg, Mutation};
pub use notify::{Notification, NotificationId, NotificationKind, NotificationQueue, Ttl, DEFAULT_TTL};
pub use prefs::{ActivityEntry, ActivityKind, ActivityLog, Theme, UserPreferences, MAX_ACTIVITY};
pub use search::{SearchOutcome, SearchPhase, SearchSession, SearchStep, SEARCH_DEBOUNCE};
pub use selection::{BatchId, BulkOperation, BulkReport, BulkStart, BulkTracker, SelectionSet};
pub use state::{AppState, Timestamp};
pub use types::{FileEntry, FolderEntry, ItemRef, Listing, SearchHits};
pub use update::update;
pub use upload::{UploadId, UploadQueue, UploadSource, UploadStart, UploadStatus, UploadTask};
pub use view_model::{AppViewModel, MutationOutcome, SearchView, UploadRowView};
