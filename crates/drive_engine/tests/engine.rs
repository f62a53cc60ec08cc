use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use drive_engine::{
    BulkAction, DriveContents, DriveGateway, EngineCommand, EngineEvent, EngineHandle,
    FailureKind, GatewayError, MutationRequest, ProgressSink, RemoteFile, RemoteFolder,
    RemoteTarget, SearchResults, UploadRequest,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

/// Records every call; `locked` ids fail with a rejection.
#[derive(Default)]
struct RecordingGateway {
    calls: Mutex<Vec<String>>,
    locked: Vec<String>,
}

impl RecordingGateway {
    fn with_locked(ids: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            locked: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn record(&self, call: String, id: &str) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        if self.locked.iter().any(|locked| locked == id) {
            return Err(GatewayError {
                kind: FailureKind::Rejected,
                message: "file is locked".to_string(),
            });
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

fn remote_file(id: &str) -> RemoteFile {
    serde_json::from_value(serde_json::json!({ "_id": id, "originalName": format!("{id}.txt") }))
        .unwrap()
}

#[async_trait::async_trait]
impl DriveGateway for RecordingGateway {
    async fn drive_contents(&self, folder: Option<&str>) -> Result<DriveContents, GatewayError> {
        self.record(format!("contents {folder:?}"), "")?;
        Ok(DriveContents {
            files: vec![remote_file("a1")],
            ..DriveContents::default()
        })
    }

    async fn breadcrumb(&self, folder: &str) -> Result<Vec<RemoteFolder>, GatewayError> {
        self.record(format!("breadcrumb {folder}"), folder)?;
        Ok(vec![serde_json::from_value(
            serde_json::json!({ "_id": folder, "name": "Reports" }),
        )
        .unwrap()])
    }

    async fn search(&self, query: &str) -> Result<SearchResults, GatewayError> {
        self.record(format!("search {query}"), "")?;
        Ok(SearchResults::default())
    }

    async fn upload_file(
        &self,
        request: &UploadRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<RemoteFile, GatewayError> {
        self.record(format!("upload {}", request.file_name), "")?;
        sink.progress(50, 100);
        tokio::select! {
            _ = cancel.cancelled() => Err(GatewayError {
                kind: FailureKind::Cancelled,
                message: "upload cancelled".to_string(),
            }),
            _ = tokio::time::sleep(Duration::from_millis(300)) => {
                sink.progress(100, 100);
                Ok(remote_file("n1"))
            }
        }
    }

    async fn download_file(&self, file_id: &str) -> Result<Bytes, GatewayError> {
        self.record(format!("download {file_id}"), file_id)?;
        Ok(Bytes::from_static(b"payload"))
    }

    async fn move_file(&self, file_id: &str, target: Option<&str>) -> Result<(), GatewayError> {
        self.record(format!("move {file_id} {target:?}"), file_id)
    }

    async fn rename_file(&self, file_id: &str, name: &str) -> Result<(), GatewayError> {
        self.record(format!("rename-file {file_id} {name}"), file_id)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), GatewayError> {
        self.record(format!("delete-file {file_id}"), file_id)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<RemoteFolder, GatewayError> {
        self.record(format!("create-folder {name} {parent:?}"), name)?;
        Ok(serde_json::from_value(serde_json::json!({ "_id": "d1", "name": name })).unwrap())
    }

    async fn rename_folder(&self, folder_id: &str, name: &str) -> Result<(), GatewayError> {
        self.record(format!("rename-folder {folder_id} {name}"), folder_id)
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), GatewayError> {
        self.record(format!("delete-folder {folder_id}"), folder_id)
    }

    async fn toggle_star(&self, file_id: &str) -> Result<(), GatewayError> {
        self.record(format!("star {file_id}"), file_id)
    }

    async fn move_to_trash(&self, file_id: &str) -> Result<(), GatewayError> {
        self.record(format!("trash {file_id}"), file_id)
    }
}

fn collect(engine: &EngineHandle, count: usize) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while events.len() < count && Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            events.push(event);
        }
    }
    events
}

fn bulk_results(events: Vec<EngineEvent>) -> Vec<(RemoteTarget, Result<(), FailureKind>)> {
    let mut results: Vec<_> = events
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::BulkItemFinished { target, result, .. } => {
                Some((target, result.map_err(|err| err.kind)))
            }
            _ => None,
        })
        .collect();
    results.sort_by_key(|(target, _)| target.to_string());
    results
}

#[test]
fn bulk_trash_maps_folders_to_delete_and_reports_each_item() {
    let gateway = Arc::new(RecordingGateway::with_locked(&["f3"]));
    let engine = EngineHandle::new(gateway.clone());
    for target in [
        RemoteTarget::File("f1".into()),
        RemoteTarget::File("f3".into()),
        RemoteTarget::Folder("d1".into()),
    ] {
        engine.send(EngineCommand::Bulk {
            batch_id: 1,
            action: BulkAction::Trash,
            target,
        });
    }

    let results = bulk_results(collect(&engine, 3));
    assert_eq!(
        results,
        vec![
            (RemoteTarget::File("f1".into()), Ok(())),
            (RemoteTarget::File("f3".into()), Err(FailureKind::Rejected)),
            (RemoteTarget::Folder("d1".into()), Ok(())),
        ]
    );
    assert_eq!(
        gateway.calls(),
        vec!["delete-folder d1", "trash f1", "trash f3"]
    );
}

#[test]
fn starring_a_folder_is_unsupported_without_a_request() {
    let gateway = Arc::new(RecordingGateway::default());
    let engine = EngineHandle::new(gateway.clone());
    engine.send(EngineCommand::Bulk {
        batch_id: 4,
        action: BulkAction::Star,
        target: RemoteTarget::Folder("d1".into()),
    });

    let results = bulk_results(collect(&engine, 1));
    assert_eq!(
        results,
        vec![(RemoteTarget::Folder("d1".into()), Err(FailureKind::Unsupported))]
    );
    assert!(gateway.calls().is_empty());
}

#[test]
fn bulk_download_writes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a1.txt");
    let engine = EngineHandle::new(Arc::new(RecordingGateway::default()));
    engine.send(EngineCommand::Bulk {
        batch_id: 2,
        action: BulkAction::Download { dest: dest.clone() },
        target: RemoteTarget::File("a1".into()),
    });

    let results = bulk_results(collect(&engine, 1));
    assert_eq!(results, vec![(RemoteTarget::File("a1".into()), Ok(()))]);
    assert_eq!(std::fs::read(dest).unwrap(), b"payload");
}

#[test]
fn listing_includes_breadcrumb_for_subfolders() {
    let engine = EngineHandle::new(Arc::new(RecordingGateway::default()));
    engine.send(EngineCommand::LoadListing {
        request_id: 4,
        folder: Some("d7".into()),
    });

    match collect(&engine, 1).pop() {
        Some(EngineEvent::ListingLoaded {
            request_id,
            folder,
            result,
        }) => {
            assert_eq!(request_id, 4);
            assert_eq!(folder.as_deref(), Some("d7"));
            let contents = result.unwrap();
            assert_eq!(contents.files.len(), 1);
            assert_eq!(contents.breadcrumb[0].name, "Reports");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn mutations_report_by_request_id() {
    let gateway = Arc::new(RecordingGateway::default());
    let engine = EngineHandle::new(gateway.clone());
    engine.send(EngineCommand::Mutate {
        request_id: 11,
        mutation: MutationRequest::RenameFolder {
            id: "d1".into(),
            name: "Archive".into(),
        },
    });

    match collect(&engine, 1).pop() {
        Some(EngineEvent::MutationFinished { request_id, result }) => {
            assert_eq!(request_id, 11);
            assert!(result.is_ok());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(gateway.calls(), vec!["rename-folder d1 Archive"]);
}

#[test]
fn aborting_an_upload_finishes_it_as_cancelled() {
    let engine = EngineHandle::new(Arc::new(RecordingGateway::default()));
    engine.send(EngineCommand::Upload {
        task_id: 3,
        attempt: 1,
        request: UploadRequest::from_path("/tmp/report.pdf", None),
    });
    std::thread::sleep(Duration::from_millis(50));
    engine.send(EngineCommand::AbortUpload { task_id: 3 });

    let events = collect(&engine, 2);
    assert_eq!(
        events[0],
        EngineEvent::UploadProgress {
            task_id: 3,
            attempt: 1,
            percent: 50
        }
    );
    match &events[1] {
        EngineEvent::UploadFinished {
            task_id,
            attempt,
            result,
        } => {
            assert_eq!((*task_id, *attempt), (3, 1));
            assert_eq!(result.as_ref().unwrap_err().kind, FailureKind::Cancelled);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn debounce_elapses_once_for_the_latest_generation() {
    let engine = EngineHandle::new(Arc::new(RecordingGateway::default()));
    for generation in 1..=3 {
        engine.send(EngineCommand::ArmDebounce {
            generation,
            delay: Duration::from_millis(60),
        });
    }

    let events = collect(&engine, 2);
    assert_eq!(events, vec![EngineEvent::DebounceElapsed { generation: 3 }]);
}
