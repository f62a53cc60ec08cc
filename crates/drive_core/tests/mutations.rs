use std::sync::Once;

use chrono::{TimeZone, Utc};
use drive_core::{
    update, ActivityEntry, ActivityKind, ActivityLog, AppState, Effect, ItemRef, Msg, Mutation,
    NotificationKind, UserPreferences, MAX_ACTIVITY,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(drive_logging::initialize_for_tests);
}

fn in_folder(folder: &str) -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::Navigate {
            folder: Some(folder.to_string()),
        },
    );
    state
}

#[test]
fn create_folder_targets_current_folder() {
    init_logging();
    let (state, effects) = update(
        in_folder("parent"),
        Msg::CreateFolderSubmitted {
            name: "  Reports ".to_string(),
        },
    );
    let mutation = Mutation::CreateFolder {
        name: "Reports".to_string(),
        parent: Some("parent".to_string()),
    };
    assert_eq!(
        effects,
        vec![Effect::Mutate {
            request_id: 1,
            mutation: mutation.clone()
        }]
    );
    assert_eq!(state.view().mutations_in_flight, 1);

    let (state, effects) = update(
        state,
        Msg::MutationFinished {
            request_id: 1,
            mutation: mutation.clone(),
            result: Ok(()),
        },
    );
    assert_eq!(
        effects[0],
        Effect::LoadListing {
            request_id: 2,
            folder: Some("parent".to_string())
        }
    );
    let view = state.view();
    assert_eq!(view.last_mutation.unwrap().result, Ok(()));
    assert_eq!(view.activity[0].kind, ActivityKind::Folder);
}

#[test]
fn empty_folder_name_is_rejected_locally() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::CreateFolderSubmitted {
            name: "   ".to_string(),
        },
    );
    assert!(effects.is_empty());
    let outcome = state.view().last_mutation.expect("outcome");
    assert!(outcome.result.is_err());
    assert_eq!(
        state.notifications().active()[0].message,
        "folder name must not be empty"
    );
}

#[test]
fn failed_rename_reports_without_refresh() {
    init_logging();
    let item = ItemRef::File("f1".to_string());
    let (state, effects) = update(
        AppState::new(),
        Msg::RenameSubmitted {
            item: item.clone(),
            name: "new.txt".to_string(),
        },
    );
    let (request_id, mutation) = match effects.into_iter().next() {
        Some(Effect::Mutate {
            request_id,
            mutation,
        }) => (request_id, mutation),
        other => panic!("unexpected effect {other:?}"),
    };

    let (state, effects) = update(
        state,
        Msg::MutationFinished {
            request_id,
            mutation,
            result: Err("http status 409".to_string()),
        },
    );
    assert!(effects.is_empty());
    let toast = state.notifications().active().last().unwrap();
    assert_eq!(toast.kind, NotificationKind::Error);
    assert_eq!(toast.message, "Failed to rename file: http status 409");

    // Duplicate response is ignored.
    let (state, effects) = update(
        state,
        Msg::MutationFinished {
            request_id,
            mutation: Mutation::Rename {
                item,
                name: "new.txt".to_string(),
            },
            result: Ok(()),
        },
    );
    assert!(effects.is_empty());
    assert!(state.view().last_mutation.unwrap().result.is_err());
}

#[test]
fn preference_change_is_persisted() {
    let preferences = UserPreferences {
        compact_mode: true,
        ..UserPreferences::default()
    };
    let (state, effects) = update(AppState::new(), Msg::PreferencesChanged(preferences.clone()));
    assert_eq!(state.preferences(), &preferences);
    assert_eq!(
        effects,
        vec![Effect::PersistSettings {
            preferences,
            activity: Vec::new()
        }]
    );
}

#[test]
fn activity_log_is_capped_newest_first() {
    let mut log = ActivityLog::new();
    for i in 0..(MAX_ACTIVITY + 5) {
        log.record(ActivityEntry {
            kind: ActivityKind::Upload,
            action: format!("upload {i}"),
            file_name: None,
            at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        });
    }
    assert_eq!(log.len(), MAX_ACTIVITY);
    let newest = log.entries().next().unwrap();
    assert_eq!(newest.action, format!("upload {}", MAX_ACTIVITY + 4));
}

#[test]
fn unmatched_engine_event_changes_nothing() {
    init_logging();
    let (state, _) = update(
        in_folder("parent"),
        Msg::CreateFolderSubmitted {
            name: "Drafts".to_string(),
        },
    );
    let mut state = state;
    state.consume_dirty();

    let (mut next, effects) = update(state.clone(), Msg::NoOp);
    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
    assert_eq!(next, state);
    assert_eq!(next.view().mutations_in_flight, 1);
}
