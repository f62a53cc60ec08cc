use std::sync::Once;

use chrono::{TimeZone, Utc};
use drive_core::{
    update, AppState, BulkOperation, BulkTracker, Effect, FileEntry, FolderEntry, ItemRef,
    Listing, Msg, NotificationKind, SelectionSet,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(drive_logging::initialize_for_tests);
}

fn file(id: &str) -> FileEntry {
    FileEntry {
        id: id.to_string(),
        name: format!("{id}.txt"),
        mime_type: "text/plain".to_string(),
        extension: ".txt".to_string(),
        size: 10,
        updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        starred: false,
        tags: Vec::new(),
        folder: None,
        path: None,
    }
}

fn folder(id: &str) -> FolderEntry {
    FolderEntry {
        id: id.to_string(),
        name: id.to_string(),
        parent: None,
        updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    }
}

fn loaded_state(files: &[&str], folders: &[&str]) -> AppState {
    loaded_with(
        files.iter().map(|id| file(id)).collect(),
        folders.iter().map(|id| folder(id)).collect(),
    )
}

fn loaded_with(files: Vec<FileEntry>, folders: Vec<FolderEntry>) -> AppState {
    let listing = Listing {
        folder: None,
        folders,
        files,
        breadcrumb: Vec::new(),
    };
    let (state, _) = update(AppState::new(), Msg::Navigate { folder: None });
    let (state, _) = update(
        state,
        Msg::ListingLoaded {
            request_id: 1,
            folder: None,
            result: Ok(listing),
        },
    );
    state
}

#[test]
fn double_toggle_restores_membership() {
    let mut selection = SelectionSet::new();
    let item = ItemRef::File("a".to_string());
    assert!(selection.toggle(item.clone()));
    assert!(!selection.toggle(item.clone()));
    assert!(!selection.contains(&item));

    selection.toggle(ItemRef::Folder("d".to_string()));
    let before = selection.clone();
    selection.toggle(item.clone());
    selection.toggle(item);
    assert_eq!(selection, before);
}

#[test]
fn select_all_replaces_with_full_listing() {
    init_logging();
    let state = loaded_state(&["f1", "f2"], &["d1"]);
    let (state, _) = update(state, Msg::SelectionToggled(ItemRef::File("gone".to_string())));
    let (state, _) = update(state, Msg::SelectAllClicked);

    assert_eq!(
        state.selection().items(),
        vec![
            ItemRef::File("f1".to_string()),
            ItemRef::File("f2".to_string()),
            ItemRef::Folder("d1".to_string()),
        ]
    );

    let (state, _) = update(state, Msg::DeselectAllClicked);
    assert!(state.selection().is_empty());
}

#[test]
fn navigating_elsewhere_clears_selection() {
    init_logging();
    let state = loaded_state(&["f1"], &[]);
    let (state, _) = update(state, Msg::SelectAllClicked);
    let (state, effects) = update(
        state,
        Msg::Navigate {
            folder: Some("d9".to_string()),
        },
    );
    assert!(state.selection().is_empty());
    assert_eq!(
        effects,
        vec![Effect::LoadListing {
            request_id: 2,
            folder: Some("d9".to_string())
        }]
    );
}

#[test]
fn bulk_delete_reports_partial_failure_per_item() {
    init_logging();
    let ids = ["f1", "f2", "f3", "f4", "f5"];
    let state = loaded_state(&ids, &[]);
    let (state, _) = update(state, Msg::SelectAllClicked);

    let (state, effects) = update(state, Msg::BulkRequested(BulkOperation::Trash));
    assert!(state.selection().is_empty());
    assert_eq!(effects.len(), 5);
    let batch_id = match &effects[0] {
        Effect::RunBulkItem { batch_id, .. } => *batch_id,
        other => panic!("unexpected effect {other:?}"),
    };

    let mut state = state;
    let mut last_effects = Vec::new();
    for id in ids {
        let result = if id == "f3" {
            Err("file is locked".to_string())
        } else {
            Ok(())
        };
        let (next, effects) = update(
            state,
            Msg::BulkItemFinished {
                batch_id,
                item: ItemRef::File(id.to_string()),
                result,
            },
        );
        state = next;
        last_effects = effects;
    }

    let report = state.view().last_bulk_report.expect("report");
    assert_eq!(report.succeeded.len(), 4);
    assert_eq!(
        report.failed,
        vec![(ItemRef::File("f3".to_string()), "file is locked".to_string())]
    );
    assert!(report.is_partial());
    assert_eq!(
        last_effects[0],
        Effect::LoadListing {
            request_id: 2,
            folder: None
        }
    );

    let toast = state.notifications().active().last().unwrap();
    assert_eq!(toast.kind, NotificationKind::Warning);
    assert!(toast.message.contains("f3: file is locked"));
    assert!(state.selection().is_empty());
}

#[test]
fn inapplicable_items_fail_without_a_request() {
    let mut tracker = BulkTracker::new();
    let start = tracker
        .start(
            BulkOperation::Star,
            vec![
                ItemRef::Folder("d1".to_string()),
                ItemRef::File("f1".to_string()),
            ],
            |_| false,
        )
        .unwrap();
    assert_eq!(start.dispatch, vec![ItemRef::File("f1".to_string())]);
    assert!(start.report.is_none());

    let report = tracker
        .record(start.batch_id, ItemRef::File("f1".to_string()), Ok(()))
        .expect("batch complete");
    assert_eq!(report.succeeded, vec![ItemRef::File("f1".to_string())]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(tracker.in_flight(), 0);

    // Late duplicate outcome is ignored.
    assert!(tracker
        .record(start.batch_id, ItemRef::File("f1".to_string()), Ok(()))
        .is_none());
}

#[test]
fn download_keeps_selection_and_skips_refresh() {
    init_logging();
    let state = loaded_state(&["f1"], &["d1"]);
    let (state, _) = update(state, Msg::SelectAllClicked);
    let (state, effects) = update(state, Msg::BulkRequested(BulkOperation::Download));

    assert_eq!(state.selection().len(), 2);
    let batch_id = match effects.as_slice() {
        [Effect::RunBulkItem { batch_id, item, .. }] => {
            assert_eq!(item, &ItemRef::File("f1".to_string()));
            *batch_id
        }
        other => panic!("unexpected effects {other:?}"),
    };
    let (_state, effects) = update(
        state,
        Msg::BulkItemFinished {
            batch_id,
            item: ItemRef::File("f1".to_string()),
            result: Ok(()),
        },
    );
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::LoadListing { .. })));
}

#[test]
fn bulk_with_empty_selection_is_a_noop() {
    let (state, effects) = update(AppState::new(), Msg::BulkRequested(BulkOperation::Delete));
    assert!(effects.is_empty());
    assert!(state.view().last_bulk_report.is_none());
}

#[test]
fn bulk_star_leaves_starred_files_alone() {
    init_logging();
    let starred = FileEntry {
        starred: true,
        ..file("f1")
    };
    let state = loaded_with(vec![starred, file("f2")], Vec::new());
    let (state, _) = update(state, Msg::SelectAllClicked);
    let (state, effects) = update(state, Msg::BulkRequested(BulkOperation::Star));

    let batch_id = match effects.as_slice() {
        [Effect::RunBulkItem { batch_id, item, .. }] => {
            assert_eq!(item, &ItemRef::File("f2".to_string()));
            *batch_id
        }
        other => panic!("unexpected effects {other:?}"),
    };
    let (state, _) = update(
        state,
        Msg::BulkItemFinished {
            batch_id,
            item: ItemRef::File("f2".to_string()),
            result: Ok(()),
        },
    );
    let report = state.view().last_bulk_report.expect("report");
    assert_eq!(
        report.succeeded,
        vec![
            ItemRef::File("f1".to_string()),
            ItemRef::File("f2".to_string()),
        ]
    );
    assert!(report.failed.is_empty());
}

#[test]
fn bulk_star_of_starred_files_finishes_without_requests() {
    init_logging();
    let starred = FileEntry {
        starred: true,
        ..file("f1")
    };
    let state = loaded_with(vec![starred], Vec::new());
    let (state, _) = update(state, Msg::SelectAllClicked);
    let (state, effects) = update(state, Msg::BulkRequested(BulkOperation::Star));

    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::RunBulkItem { .. })));
    let report = state.view().last_bulk_report.expect("report");
    assert_eq!(report.succeeded, vec![ItemRef::File("f1".to_string())]);
    assert_eq!(state.view().bulk_in_flight, 0);
}
