use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use drive_logging::{drive_debug, drive_error, drive_info};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::timer::Debouncer;
use crate::upload::ChannelProgressSink;
use crate::{
    AtomicFileWriter, BulkAction, DriveGateway, EngineEvent, FailureKind, GatewayError,
    RemoteTarget, UploadRequest,
};

/// Single-item writes that are not part of a bulk batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRequest {
    CreateFolder { name: String, parent: Option<String> },
    RenameFile { id: String, name: String },
    RenameFolder { id: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    LoadListing {
        request_id: u64,
        folder: Option<String>,
    },
    Upload {
        task_id: u64,
        attempt: u32,
        request: UploadRequest,
    },
    AbortUpload {
        task_id: u64,
    },
    ArmDebounce {
        generation: u64,
        delay: Duration,
    },
    CancelDebounce,
    Search {
        token: u64,
        query: String,
    },
    Bulk {
        batch_id: u64,
        action: BulkAction,
        target: RemoteTarget,
    },
    Mutate {
        request_id: u64,
        mutation: MutationRequest,
    },
}

type UploadTokens = Arc<Mutex<HashMap<u64, (u32, CancellationToken)>>>;

/// Owns the IO thread. Commands go in, `EngineEvent`s come out.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(gateway: Arc<dyn DriveGateway>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    drive_error!("engine: failed to start tokio runtime: {err}");
                    return;
                }
            };
            let mut worker = Worker {
                gateway,
                event_tx,
                uploads: Arc::new(Mutex::new(HashMap::new())),
                debouncer: Debouncer::new(runtime.handle().clone()),
            };
            while let Ok(command) = cmd_rx.recv() {
                worker.dispatch(&runtime, command);
            }
            drive_debug!("engine: command channel closed, shutting down");
        });

        Self { cmd_tx, event_rx }
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            drive_error!("engine: worker thread is gone, command dropped");
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct Worker {
    gateway: Arc<dyn DriveGateway>,
    event_tx: mpsc::Sender<EngineEvent>,
    uploads: UploadTokens,
    debouncer: Debouncer,
}

impl Worker {
    fn dispatch(&mut self, runtime: &Runtime, command: EngineCommand) {
        let gateway = self.gateway.clone();
        let event_tx = self.event_tx.clone();
        match command {
            EngineCommand::LoadListing { request_id, folder } => {
                runtime.spawn(async move {
                    let result = load_listing(gateway.as_ref(), folder.as_deref()).await;
                    let _ = event_tx.send(EngineEvent::ListingLoaded {
                        request_id,
                        folder,
                        result,
                    });
                });
            }
            EngineCommand::Upload {
                task_id,
                attempt,
                request,
            } => {
                let token = CancellationToken::new();
                let previous = lock(&self.uploads).insert(task_id, (attempt, token.clone()));
                if let Some((_, stale)) = previous {
                    stale.cancel();
                }
                let uploads = self.uploads.clone();
                drive_info!("engine: upload {task_id} attempt {attempt}: {}", request.file_name);
                runtime.spawn(async move {
                    let sink = Arc::new(ChannelProgressSink::new(event_tx.clone(), task_id, attempt));
                    let result = gateway.upload_file(&request, sink, &token).await;
                    {
                        let mut uploads = lock(&uploads);
                        if uploads.get(&task_id).is_some_and(|(current, _)| *current == attempt) {
                            uploads.remove(&task_id);
                        }
                    }
                    let _ = event_tx.send(EngineEvent::UploadFinished {
                        task_id,
                        attempt,
                        result,
                    });
                });
            }
            EngineCommand::AbortUpload { task_id } => {
                if let Some((_, token)) = lock(&self.uploads).remove(&task_id) {
                    drive_debug!("engine: aborting upload {task_id}");
                    token.cancel();
                }
            }
            EngineCommand::ArmDebounce { generation, delay } => {
                self.debouncer.arm(delay, move || {
                    let _ = event_tx.send(EngineEvent::DebounceElapsed { generation });
                });
            }
            EngineCommand::CancelDebounce => self.debouncer.cancel(),
            EngineCommand::Search { token, query } => {
                runtime.spawn(async move {
                    let result = gateway.search(&query).await;
                    let _ = event_tx.send(EngineEvent::SearchFinished { token, result });
                });
            }
            EngineCommand::Bulk {
                batch_id,
                action,
                target,
            } => {
                runtime.spawn(async move {
                    let result = run_bulk_item(gateway.as_ref(), &action, &target).await;
                    let _ = event_tx.send(EngineEvent::BulkItemFinished {
                        batch_id,
                        target,
                        result,
                    });
                });
            }
            EngineCommand::Mutate {
                request_id,
                mutation,
            } => {
                runtime.spawn(async move {
                    let result = run_mutation(gateway.as_ref(), &mutation).await;
                    let _ = event_tx.send(EngineEvent::MutationFinished { request_id, result });
                });
            }
        }
    }
}

fn lock(uploads: &UploadTokens) -> std::sync::MutexGuard<'_, HashMap<u64, (u32, CancellationToken)>> {
    uploads.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn load_listing(
    gateway: &dyn DriveGateway,
    folder: Option<&str>,
) -> Result<crate::DriveContents, GatewayError> {
    let mut contents = gateway.drive_contents(folder).await?;
    if let Some(folder) = folder {
        contents.breadcrumb = gateway.breadcrumb(folder).await?;
    }
    Ok(contents)
}

/// Maps one bulk item to its gateway call. Trash on a folder deletes it.
pub(crate) async fn run_bulk_item(
    gateway: &dyn DriveGateway,
    action: &BulkAction,
    target: &RemoteTarget,
) -> Result<(), GatewayError> {
    match (action, target) {
        (BulkAction::Download { dest }, RemoteTarget::File(id)) => {
            let bytes = gateway.download_file(id).await?;
            save_download(dest, bytes).await
        }
        (BulkAction::Trash, RemoteTarget::File(id)) => gateway.move_to_trash(id).await,
        (BulkAction::Trash | BulkAction::Delete, RemoteTarget::Folder(id)) => {
            gateway.delete_folder(id).await
        }
        (BulkAction::Delete, RemoteTarget::File(id)) => gateway.delete_file(id).await,
        (BulkAction::Star, RemoteTarget::File(id)) => gateway.toggle_star(id).await,
        (BulkAction::Move { target }, RemoteTarget::File(id)) => {
            gateway.move_file(id, target.as_deref()).await
        }
        (action, target) => Err(GatewayError::new(
            FailureKind::Unsupported,
            format!("{action:?} is not available for {target}"),
        )),
    }
}

async fn save_download(dest: &Path, bytes: bytes::Bytes) -> Result<(), GatewayError> {
    let dir = dest
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            GatewayError::new(
                FailureKind::LocalIo,
                format!("{} has no file name", dest.display()),
            )
        })?;
    let written = tokio::task::spawn_blocking(move || {
        AtomicFileWriter::new(dir).write_bytes(&name, &bytes)
    })
    .await
    .map_err(|err| GatewayError::new(FailureKind::LocalIo, err.to_string()))?
    .map_err(|err| GatewayError::new(FailureKind::LocalIo, err.to_string()))?;
    drive_info!("engine: saved {}", written.display());
    Ok(())
}

async fn run_mutation(
    gateway: &dyn DriveGateway,
    mutation: &MutationRequest,
) -> Result<(), GatewayError> {
    match mutation {
        MutationRequest::CreateFolder { name, parent } => gateway
            .create_folder(name, parent.as_deref())
            .await
            .map(|_| ()),
        MutationRequest::RenameFile { id, name } => gateway.rename_file(id, name).await,
        MutationRequest::RenameFolder { id, name } => gateway.rename_folder(id, name).await,
    }
}
