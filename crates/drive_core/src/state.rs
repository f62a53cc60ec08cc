use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::view_model::{AppViewModel, MutationOutcome, SearchView, UploadRowView};
use crate::{
    project, ActivityEntry, ActivityKind, ActivityLog, BulkReport, BulkTracker, Listing,
    NotificationKind, NotificationQueue, SearchSession, SelectionSet, Ttl, UploadQueue,
    UserPreferences, ViewOptions,
};

/// Clock reading carried by `Msg::Tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub mono: Instant,
    pub wall: DateTime<Utc>,
}

impl Timestamp {
    pub fn now() -> Self {
        Self {
            mono: Instant::now(),
            wall: Utc::now(),
        }
    }

    pub fn advanced(self, by: Duration) -> Self {
        let wall_delta = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            mono: self.mono + by,
            wall: self.wall + wall_delta,
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

/// All transient client state. Each coordinator owns its own slice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) now: Timestamp,
    pub(crate) folder: Option<String>,
    pub(crate) listing: Option<Listing>,
    pub(crate) listing_error: Option<String>,
    pub(crate) loading: bool,
    /// Id of the most recent listing request; older responses are dropped.
    pub(crate) listing_request: u64,
    pub(crate) view_options: ViewOptions,
    pub(crate) uploads: UploadQueue,
    pub(crate) search: SearchSession,
    pub(crate) selection: SelectionSet,
    pub(crate) bulk: BulkTracker,
    pub(crate) notifications: NotificationQueue,
    pub(crate) preferences: UserPreferences,
    pub(crate) activity: ActivityLog,
    pub(crate) last_bulk_report: Option<BulkReport>,
    pub(crate) last_mutation: Option<MutationOutcome>,
    pub(crate) pending_mutations: BTreeSet<u64>,
    pub(crate) next_request: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let (folders, files) = match &self.listing {
            Some(listing) => {
                let projection = project(&listing.folders, &listing.files, &self.view_options);
                (projection.folders, projection.files)
            }
            None => (Vec::new(), Vec::new()),
        };

        AppViewModel {
            folder: self.folder.clone(),
            breadcrumb: self
                .listing
                .as_ref()
                .map(|listing| listing.breadcrumb.iter().map(|f| f.name.clone()).collect())
                .unwrap_or_default(),
            loading: self.loading,
            listing_error: self.listing_error.clone(),
            view_options: self.view_options,
            folders,
            files,
            uploads: self
                .uploads
                .tasks()
                .map(|task| UploadRowView {
                    task_id: task.id,
                    name: task.display_name.clone(),
                    status: task.status,
                    progress_percent: task.progress_percent,
                    error: task.last_error.clone(),
                })
                .collect(),
            upload_progress: self.uploads.overall_progress(),
            uploads_active: self.uploads.has_active(),
            search: SearchView {
                query: self.search.query().to_string(),
                phase: self.search.phase(),
                pending: self.search.is_pending(),
                hits: self.search.results().cloned(),
            },
            selected: self.selection.items(),
            bulk_in_flight: self.bulk.in_flight(),
            last_bulk_report: self.last_bulk_report.clone(),
            last_mutation: self.last_mutation.clone(),
            mutations_in_flight: self.pending_mutations.len(),
            notifications: self.notifications.active().to_vec(),
            preferences: self.preferences.clone(),
            activity: self.activity.snapshot(),
            dirty: self.dirty,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    pub fn search(&self) -> &SearchSession {
        &self.search
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Returns whether state changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn next_request_id(&mut self) -> u64 {
        self.next_request += 1;
        self.next_request
    }

    /// Posts a notification unless the user silenced non-error ones.
    pub(crate) fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        if !self.preferences.notifications && kind != NotificationKind::Error {
            return;
        }
        self.notifications
            .post(message, kind, Ttl::default(), self.now.mono);
        self.dirty = true;
    }

    pub(crate) fn record_activity(
        &mut self,
        kind: ActivityKind,
        action: impl Into<String>,
        file_name: Option<String>,
    ) {
        self.activity.record(ActivityEntry {
            kind,
            action: action.into(),
            file_name,
            at: self.now.wall,
        });
    }
}
