use std::path::PathBuf;
use std::sync::Once;

use drive_core::{
    update, AppState, CoordinatorError, Effect, Msg, NotificationKind, UploadQueue, UploadSource,
    UploadStatus, ValidationError,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(drive_logging::initialize_for_tests);
}

fn source(name: &str, len: u64) -> UploadSource {
    UploadSource {
        path: PathBuf::from(format!("/tmp/{name}")),
        byte_len: len,
    }
}

fn request(state: AppState, name: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::UploadRequested {
            display_name: name.to_string(),
            source: source(name, 10),
        },
    )
}

#[test]
fn overall_progress_is_unweighted_mean() {
    let mut queue = UploadQueue::new();
    let a = queue.enqueue("a.txt", source("a.txt", 10), None).unwrap();
    let b = queue.enqueue("b.bin", source("b.bin", 10_000_000), None).unwrap();
    let c = queue.enqueue("c.pdf", source("c.pdf", 3), None).unwrap();

    queue.update_progress(a.task_id, a.attempt, 40);
    queue.mark_complete(a.task_id, a.attempt);
    queue.update_progress(b.task_id, b.attempt, 50);

    assert_eq!(queue.get(c.task_id).unwrap().progress_percent, 0);
    assert_eq!(queue.overall_progress(), 50.0);
}

#[test]
fn overall_progress_stays_in_bounds() {
    let mut queue = UploadQueue::new();
    assert_eq!(queue.overall_progress(), 0.0);

    let mut starts = Vec::new();
    for i in 0..7 {
        let name = format!("f{i}");
        starts.push(queue.enqueue(&name, source(&name, 1), None).unwrap());
    }
    for (i, start) in starts.iter().enumerate() {
        queue.update_progress(start.task_id, start.attempt, (i * 30) as u8);
        let overall = queue.overall_progress();
        assert!((0.0..=100.0).contains(&overall), "overall {overall}");
    }
    let expected: f64 = queue
        .tasks()
        .map(|t| f64::from(t.progress_percent))
        .sum::<f64>()
        / 7.0;
    assert_eq!(queue.overall_progress(), expected);
}

#[test]
fn progress_never_moves_backwards_within_an_attempt() {
    let mut queue = UploadQueue::new();
    let start = queue.enqueue("a", source("a", 5), None).unwrap();
    assert!(queue.update_progress(start.task_id, start.attempt, 70));
    assert!(queue.update_progress(start.task_id, start.attempt, 30));
    let task = queue.get(start.task_id).unwrap();
    assert_eq!(task.progress_percent, 70);
    assert_eq!(task.status, UploadStatus::Uploading);
}

#[test]
fn empty_inputs_are_rejected_before_any_request() {
    let mut queue = UploadQueue::new();
    assert_eq!(
        queue.enqueue("   ", source("x", 5), None),
        Err(ValidationError::EmptyFileName)
    );
    assert_eq!(
        queue.enqueue("empty.txt", source("empty.txt", 0), None),
        Err(ValidationError::EmptyFile("empty.txt".to_string()))
    );
    assert!(queue.is_empty());

    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::UploadRequested {
            display_name: "empty.txt".to_string(),
            source: source("empty.txt", 0),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.notifications().active()[0].kind, NotificationKind::Error);
}

#[test]
fn each_enqueue_starts_exactly_one_upload_with_unique_ids() {
    init_logging();
    let (state, first) = request(AppState::new(), "a.txt");
    let (state, second) = request(state, "b.txt");

    let ids: Vec<u64> = first
        .iter()
        .chain(second.iter())
        .map(|effect| match effect {
            Effect::StartUpload(start) => start.task_id,
            other => panic!("unexpected effect {other:?}"),
        })
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(state.uploads().len(), 2);
}

#[test]
fn failure_keeps_message_and_retry_reuses_the_id() {
    init_logging();
    let (state, _) = request(AppState::new(), "report.pdf");
    let (state, _) = update(
        state,
        Msg::UploadProgress {
            task_id: 1,
            attempt: 1,
            percent: 35,
        },
    );
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            task_id: 1,
            attempt: 1,
            result: Err("connection reset".to_string()),
        },
    );
    assert!(effects.is_empty());
    let task = state.uploads().get(1).unwrap();
    assert_eq!(task.status, UploadStatus::Error);
    assert_eq!(task.last_error.as_deref(), Some("connection reset"));
    let toast = state.notifications().active().last().unwrap();
    assert_eq!(toast.kind, NotificationKind::Error);
    assert!(toast.message.contains("connection reset"));

    let (state, effects) = update(state, Msg::UploadRetryClicked(1));
    match effects.as_slice() {
        [Effect::StartUpload(start)] => {
            assert_eq!(start.task_id, 1);
            assert_eq!(start.attempt, 2);
        }
        other => panic!("unexpected effects {other:?}"),
    }
    let task = state.uploads().get(1).unwrap();
    assert_eq!(task.status, UploadStatus::Pending);
    assert_eq!(task.progress_percent, 0);
    assert_eq!(state.uploads().len(), 1);

    // Late callback from the first attempt is dropped.
    let (state, _) = update(
        state,
        Msg::UploadProgress {
            task_id: 1,
            attempt: 1,
            percent: 90,
        },
    );
    assert_eq!(state.uploads().get(1).unwrap().progress_percent, 0);
}

#[test]
fn cancel_aborts_and_discards_later_callbacks() {
    init_logging();
    let (state, _) = request(AppState::new(), "movie.mp4");
    let (mut state, effects) = update(state, Msg::UploadCancelClicked(1));
    assert_eq!(effects, vec![Effect::AbortUpload { task_id: 1 }]);
    assert!(state.uploads().is_empty());
    assert!(state.consume_dirty());

    let (mut state, effects) = update(
        state,
        Msg::UploadProgress {
            task_id: 1,
            attempt: 1,
            percent: 50,
        },
    );
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());

    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            task_id: 1,
            attempt: 1,
            result: Ok(()),
        },
    );
    assert!(effects.is_empty());
    assert!(state.uploads().is_empty());
}

#[test]
fn completion_refreshes_listing_and_records_activity() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::Navigate {
            folder: Some("f1".to_string()),
        },
    );
    let (state, _) = request(state, "notes.md");
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            task_id: 1,
            attempt: 1,
            result: Ok(()),
        },
    );

    assert_eq!(
        effects[0],
        Effect::LoadListing {
            request_id: 2,
            folder: Some("f1".to_string())
        }
    );
    assert!(matches!(effects[1], Effect::PersistSettings { .. }));
    let task = state.uploads().get(1).unwrap();
    assert_eq!(task.status, UploadStatus::Complete);
    assert_eq!(task.progress_percent, 100);
    assert_eq!(task.folder.as_deref(), Some("f1"));
    assert_eq!(state.activity().len(), 1);

    let (state, _) = update(state, Msg::ClearCompletedUploads);
    assert!(state.uploads().is_empty());
}

#[test]
fn retry_is_only_valid_from_error() {
    let mut queue = UploadQueue::new();
    let start = queue.enqueue("a", source("a", 5), None).unwrap();
    assert_eq!(
        queue.retry(start.task_id),
        Err(CoordinatorError::NotRetryable {
            id: start.task_id,
            status: "pending"
        })
    );
    assert_eq!(queue.retry(99), Err(CoordinatorError::UnknownTask(99)));
    assert_eq!(queue.cancel(99), Err(CoordinatorError::UnknownTask(99)));
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "coordinator invariant violated")]
fn cancelling_an_unknown_task_is_a_programmer_error() {
    init_logging();
    let _ = update(AppState::new(), Msg::UploadCancelClicked(42));
}
