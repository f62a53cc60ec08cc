use std::collections::BTreeSet;

use drive_logging::{drive_debug, drive_error, drive_warn};

use crate::{
    ActivityKind, AppState, BulkOperation, BulkReport, CoordinatorError, Effect, ItemRef, Msg,
    Mutation, MutationOutcome, NotificationKind, SearchOutcome, SearchStep, ValidationError,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Tick(now) => {
            state.now = now;
            if !state.notifications.expire(now.mono).is_empty() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Navigate { folder } => {
            if folder != state.folder {
                state.selection.clear();
                state.folder = folder;
            }
            vec![reload(&mut state)]
        }
        Msg::Refresh => vec![reload(&mut state)],
        Msg::ListingLoaded {
            request_id,
            folder,
            result,
        } => {
            if folder != state.folder {
                drive_debug!("Dropping listing for {:?}; now in {:?}", folder, state.folder);
                return (state, Vec::new());
            }
            if request_id != state.listing_request {
                drive_debug!(
                    "Dropping listing response {}; latest is {}",
                    request_id,
                    state.listing_request
                );
                return (state, Vec::new());
            }
            state.loading = false;
            match result {
                Ok(listing) => {
                    state.selection.retain_listed(&listing.item_refs());
                    state.listing = Some(listing);
                    state.listing_error = None;
                }
                Err(message) => {
                    // Keep the previous listing on screen.
                    state.notify(
                        NotificationKind::Error,
                        format!("Failed to load drive contents: {message}"),
                    );
                    state.listing_error = Some(message);
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::SortChanged(key) => {
            state.view_options = state.view_options.sorted_by(key);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SortOrderToggled => {
            state.view_options.sort_order = state.view_options.sort_order.flipped();
            state.mark_dirty();
            Vec::new()
        }
        Msg::FilterChanged(filter) => {
            state.view_options.filter = filter;
            state.mark_dirty();
            Vec::new()
        }
        Msg::UploadRequested {
            display_name,
            source,
        } => {
            let folder = state.folder.clone();
            match state.uploads.enqueue(&display_name, source, folder) {
                Ok(start) => {
                    state.mark_dirty();
                    vec![Effect::StartUpload(start)]
                }
                Err(err) => {
                    state.notify(NotificationKind::Error, err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::UploadProgress {
            task_id,
            attempt,
            percent,
        } => {
            if state.uploads.update_progress(task_id, attempt, percent) {
                state.mark_dirty();
            } else {
                drive_debug!("Stale progress for upload {} attempt {}", task_id, attempt);
            }
            Vec::new()
        }
        Msg::UploadFinished {
            task_id,
            attempt,
            result,
        } => apply_upload_finished(&mut state, task_id, attempt, result),
        Msg::UploadRetryClicked(task_id) => match state.uploads.retry(task_id) {
            Ok(start) => {
                state.mark_dirty();
                vec![Effect::StartUpload(start)]
            }
            Err(err @ CoordinatorError::UnknownTask(_)) => {
                invariant_violation(&err);
                Vec::new()
            }
            Err(err) => {
                drive_warn!("Ignoring retry: {}", err);
                Vec::new()
            }
        },
        Msg::UploadCancelClicked(task_id) => match state.uploads.cancel(task_id) {
            Ok(task) => {
                state.notify(
                    NotificationKind::Info,
                    format!("Cancelled upload of \"{}\"", task.display_name),
                );
                state.mark_dirty();
                vec![Effect::AbortUpload { task_id }]
            }
            Err(err) => {
                invariant_violation(&err);
                Vec::new()
            }
        },
        Msg::ClearCompletedUploads => {
            if state.uploads.clear_completed() > 0 {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SearchInputChanged(text) => {
            state.mark_dirty();
            match state.search.input(&text) {
                SearchStep::Arm { generation, delay } => {
                    vec![Effect::ArmSearchDebounce { generation, delay }]
                }
                SearchStep::Cleared => vec![Effect::CancelSearchDebounce],
            }
        }
        Msg::SearchDebounceElapsed { generation } => {
            match state.search.debounce_elapsed(generation) {
                Some((token, query)) => {
                    state.mark_dirty();
                    vec![Effect::RunSearch { token, query }]
                }
                None => Vec::new(),
            }
        }
        Msg::SearchResolved { token, result } => {
            match state.search.resolve(token, result) {
                SearchOutcome::Applied => state.mark_dirty(),
                SearchOutcome::Failed(message) => {
                    state.notify(NotificationKind::Error, format!("Search failed: {message}"));
                    state.mark_dirty();
                }
                SearchOutcome::Stale => {
                    drive_debug!("Discarding stale search response {}", token);
                }
            }
            Vec::new()
        }
        Msg::SearchCleared => {
            state.search.clear();
            state.mark_dirty();
            vec![Effect::CancelSearchDebounce]
        }
        Msg::SelectionToggled(item) => {
            state.selection.toggle(item);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SelectAllClicked => {
            let items = state
                .listing
                .as_ref()
                .map(|listing| listing.item_refs())
                .unwrap_or_default();
            state.selection.select_all(items);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DeselectAllClicked => {
            state.selection.clear();
            state.mark_dirty();
            Vec::new()
        }
        Msg::BulkRequested(operation) => start_bulk(&mut state, operation),
        Msg::BulkItemFinished {
            batch_id,
            item,
            result,
        } => match state.bulk.record(batch_id, item, result) {
            Some(report) => finish_bulk(&mut state, report),
            None => Vec::new(),
        },
        Msg::CreateFolderSubmitted { name } => {
            let name = name.trim().to_string();
            let mutation = Mutation::CreateFolder {
                name: name.clone(),
                parent: state.folder.clone(),
            };
            if name.is_empty() {
                reject_mutation(&mut state, mutation, ValidationError::EmptyFolderName)
            } else {
                issue_mutation(&mut state, mutation)
            }
        }
        Msg::RenameSubmitted { item, name } => {
            let name = name.trim().to_string();
            let mutation = Mutation::Rename {
                item,
                name: name.clone(),
            };
            if name.is_empty() {
                reject_mutation(&mut state, mutation, ValidationError::EmptyName)
            } else {
                issue_mutation(&mut state, mutation)
            }
        }
        Msg::MutationFinished {
            request_id,
            mutation,
            result,
        } => apply_mutation_finished(&mut state, request_id, mutation, result),
        Msg::NotificationDismissed(id) => {
            if state.notifications.dismiss(id) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::PreferencesChanged(preferences) => {
            state.preferences = preferences;
            state.notify(NotificationKind::Success, "Settings saved successfully");
            state.mark_dirty();
            vec![persist(&state)]
        }
        Msg::RestorePersisted {
            preferences,
            activity,
        } => {
            state.preferences = preferences;
            state.activity = crate::ActivityLog::from_entries(activity);
            state.mark_dirty();
            Vec::new()
        }
        Msg::ClearActivity => {
            state.activity.clear();
            state.mark_dirty();
            vec![persist(&state)]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn reload(state: &mut AppState) -> Effect {
    state.listing_request += 1;
    state.loading = true;
    state.mark_dirty();
    Effect::LoadListing {
        request_id: state.listing_request,
        folder: state.folder.clone(),
    }
}

fn persist(state: &AppState) -> Effect {
    Effect::PersistSettings {
        preferences: state.preferences.clone(),
        activity: state.activity.snapshot(),
    }
}

fn invariant_violation(err: &CoordinatorError) {
    drive_error!("Coordinator invariant violated: {}", err);
    debug_assert!(false, "coordinator invariant violated: {err}");
}

fn apply_upload_finished(
    state: &mut AppState,
    task_id: u64,
    attempt: u32,
    result: Result<(), String>,
) -> Vec<Effect> {
    match result {
        Ok(()) => {
            let Some(task) = state.uploads.mark_complete(task_id, attempt) else {
                drive_debug!("Upload {} finished after cancel or retry", task_id);
                return Vec::new();
            };
            let name = task.display_name.clone();
            state.notify(
                NotificationKind::Success,
                format!("\"{name}\" uploaded successfully"),
            );
            state.record_activity(ActivityKind::Upload, "Uploaded", Some(name));
            if state.preferences.auto_clear_uploads {
                state.uploads.remove(task_id);
            }
            vec![reload(state), persist(state)]
        }
        Err(message) => {
            let Some(task) = state.uploads.mark_error(task_id, attempt, message.clone()) else {
                drive_debug!("Upload {} failed after cancel or retry", task_id);
                return Vec::new();
            };
            let name = task.display_name.clone();
            drive_warn!("Upload {} ({}) failed: {}", task_id, name, message);
            state.notify(
                NotificationKind::Error,
                format!("Failed to upload \"{name}\": {message}"),
            );
            state.mark_dirty();
            Vec::new()
        }
    }
}

fn start_bulk(state: &mut AppState, operation: BulkOperation) -> Vec<Effect> {
    let items = state.selection.items();
    if items.is_empty() {
        return Vec::new();
    }
    if operation.is_mutation() {
        state.selection.clear();
    }
    state.mark_dirty();

    // Star is a toggle on the server; skip files that are starred already.
    let starred: BTreeSet<ItemRef> = match (&operation, &state.listing) {
        (BulkOperation::Star, Some(listing)) => listing
            .files
            .iter()
            .filter(|file| file.starred)
            .map(|file| ItemRef::File(file.id.clone()))
            .collect(),
        _ => BTreeSet::new(),
    };
    let Some(start) = state
        .bulk
        .start(operation.clone(), items, |item| starred.contains(item))
    else {
        return Vec::new();
    };
    if let Some(report) = start.report {
        return finish_bulk(state, report);
    }
    start
        .dispatch
        .into_iter()
        .map(|item| Effect::RunBulkItem {
            batch_id: start.batch_id,
            operation: operation.clone(),
            item,
        })
        .collect()
}

fn finish_bulk(state: &mut AppState, report: BulkReport) -> Vec<Effect> {
    let kind = if report.failed.is_empty() {
        NotificationKind::Success
    } else if report.succeeded.is_empty() {
        NotificationKind::Error
    } else {
        NotificationKind::Warning
    };
    if !report.failed.is_empty() {
        drive_warn!("Bulk batch {} had failures: {}", report.batch_id, report.summary());
    }
    state.notify(kind, report.summary());

    let mut effects = Vec::new();
    if !report.succeeded.is_empty() {
        state.record_activity(
            activity_kind(&report.operation),
            format!("Bulk {} of {} item(s)", report.operation, report.succeeded.len()),
            None,
        );
        effects.push(persist(state));
    }
    if report.operation.is_mutation() {
        effects.insert(0, reload(state));
    }
    state.last_bulk_report = Some(report);
    state.mark_dirty();
    effects
}

fn activity_kind(operation: &BulkOperation) -> ActivityKind {
    match operation {
        BulkOperation::Download => ActivityKind::Download,
        BulkOperation::Trash => ActivityKind::Trash,
        BulkOperation::Delete => ActivityKind::Delete,
        BulkOperation::Star => ActivityKind::Star,
        BulkOperation::Move { .. } => ActivityKind::Move,
    }
}

fn issue_mutation(state: &mut AppState, mutation: Mutation) -> Vec<Effect> {
    let request_id = state.next_request_id();
    state.pending_mutations.insert(request_id);
    state.mark_dirty();
    vec![Effect::Mutate {
        request_id,
        mutation,
    }]
}

fn reject_mutation(state: &mut AppState, mutation: Mutation, err: ValidationError) -> Vec<Effect> {
    state.notify(NotificationKind::Error, err.to_string());
    state.last_mutation = Some(MutationOutcome {
        mutation,
        result: Err(err.to_string()),
    });
    state.mark_dirty();
    Vec::new()
}

fn apply_mutation_finished(
    state: &mut AppState,
    request_id: u64,
    mutation: Mutation,
    result: Result<(), String>,
) -> Vec<Effect> {
    if !state.pending_mutations.remove(&request_id) {
        drive_debug!("Ignoring unknown mutation response {}", request_id);
        return Vec::new();
    }

    let mut effects = Vec::new();
    match &result {
        Ok(()) => {
            let (kind, message, name) = match &mutation {
                Mutation::CreateFolder { name, .. } => (
                    ActivityKind::Folder,
                    format!("Folder \"{name}\" created"),
                    name.clone(),
                ),
                Mutation::Rename { item, name } => (
                    ActivityKind::Rename,
                    format!("Renamed {} to \"{name}\"", item_noun(item)),
                    name.clone(),
                ),
            };
            state.notify(NotificationKind::Success, message.clone());
            state.record_activity(kind, message, Some(name));
            effects.push(reload(state));
            effects.push(persist(state));
        }
        Err(message) => {
            let action = match &mutation {
                Mutation::CreateFolder { .. } => "create folder".to_string(),
                Mutation::Rename { item, .. } => format!("rename {}", item_noun(item)),
            };
            state.notify(
                NotificationKind::Error,
                format!("Failed to {action}: {message}"),
            );
        }
    }
    state.last_mutation = Some(MutationOutcome { mutation, result });
    state.mark_dirty();
    effects
}

fn item_noun(item: &ItemRef) -> &'static str {
    if item.is_folder() {
        "folder"
    } else {
        "file"
    }
}
