use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use drive_core::{
    AppState, BulkOperation, Effect, FileEntry, FolderEntry, ItemRef, Listing, Msg, Mutation,
    SearchHits, UploadStart,
};
use drive_engine::{
    BulkAction, DriveContents, EngineCommand, EngineEvent, EngineHandle, FailureKind,
    GatewayError, MutationRequest, RemoteFile, RemoteFolder, RemoteTarget, SearchResults,
    UploadRequest,
};
use drive_logging::{drive_debug, drive_info, drive_warn};

use super::persistence;

/// Turns core effects into engine commands and engine events back into messages.
pub(crate) struct EffectRunner {
    engine: EngineHandle,
    settings_dir: PathBuf,
    download_dir: PathBuf,
    mutations: HashMap<u64, Mutation>,
}

impl EffectRunner {
    pub(crate) fn new(engine: EngineHandle, settings_dir: PathBuf) -> Self {
        Self {
            engine,
            settings_dir,
            download_dir: PathBuf::from("."),
            mutations: HashMap::new(),
        }
    }

    pub(crate) fn set_download_dir(&mut self, dir: PathBuf) {
        self.download_dir = dir;
    }

    pub(crate) fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    /// `state` is the state the effects were produced with; downloads use it
    /// to name files.
    pub(crate) fn run(&mut self, effects: Vec<Effect>, state: &AppState) {
        for effect in effects {
            match effect {
                Effect::LoadListing { request_id, folder } => {
                    drive_debug!("LoadListing request={} folder={:?}", request_id, folder);
                    self.engine
                        .send(EngineCommand::LoadListing { request_id, folder });
                }
                Effect::StartUpload(start) => {
                    drive_info!(
                        "StartUpload task={} attempt={} name={}",
                        start.task_id,
                        start.attempt,
                        start.display_name
                    );
                    self.engine.send(upload_command(start));
                }
                Effect::AbortUpload { task_id } => {
                    self.engine.send(EngineCommand::AbortUpload { task_id });
                }
                Effect::ArmSearchDebounce { generation, delay } => {
                    self.engine
                        .send(EngineCommand::ArmDebounce { generation, delay });
                }
                Effect::CancelSearchDebounce => self.engine.send(EngineCommand::CancelDebounce),
                Effect::RunSearch { token, query } => {
                    drive_debug!("RunSearch token={} query_len={}", token, query.len());
                    self.engine.send(EngineCommand::Search { token, query });
                }
                Effect::RunBulkItem {
                    batch_id,
                    operation,
                    item,
                } => {
                    let action = self.bulk_action(&operation, &item, state);
                    self.engine.send(EngineCommand::Bulk {
                        batch_id,
                        action,
                        target: remote_target(&item),
                    });
                }
                Effect::Mutate {
                    request_id,
                    mutation,
                } => {
                    self.engine.send(EngineCommand::Mutate {
                        request_id,
                        mutation: mutation_request(&mutation),
                    });
                    self.mutations.insert(request_id, mutation);
                }
                Effect::PersistSettings {
                    preferences,
                    activity,
                } => persistence::save_settings(&self.settings_dir, &preferences, &activity),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub(crate) fn next_msg(&mut self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        Some(self.map_event(event))
    }

    fn map_event(&mut self, event: EngineEvent) -> Msg {
        match event {
            EngineEvent::ListingLoaded {
                request_id,
                folder,
                result,
            } => Msg::ListingLoaded {
                request_id,
                result: result
                    .map(|contents| map_listing(folder.clone(), contents))
                    .map_err(|err| describe(&err)),
                folder,
            },
            EngineEvent::UploadProgress {
                task_id,
                attempt,
                percent,
            } => Msg::UploadProgress {
                task_id,
                attempt,
                percent,
            },
            EngineEvent::UploadFinished {
                task_id,
                attempt,
                result,
            } => Msg::UploadFinished {
                task_id,
                attempt,
                result: result.map(|_| ()).map_err(|err| describe(&err)),
            },
            EngineEvent::DebounceElapsed { generation } => {
                Msg::SearchDebounceElapsed { generation }
            }
            EngineEvent::SearchFinished { token, result } => Msg::SearchResolved {
                token,
                result: result.map(map_search).map_err(|err| describe(&err)),
            },
            EngineEvent::BulkItemFinished {
                batch_id,
                target,
                result,
            } => Msg::BulkItemFinished {
                batch_id,
                item: item_ref(target),
                result: result.map_err(|err| describe(&err)),
            },
            EngineEvent::MutationFinished { request_id, result } => {
                match self.mutations.remove(&request_id) {
                    Some(mutation) => Msg::MutationFinished {
                        request_id,
                        mutation,
                        result: result.map_err(|err| describe(&err)),
                    },
                    None => {
                        drive_warn!("Engine finished unknown mutation {}", request_id);
                        Msg::NoOp
                    }
                }
            }
        }
    }

    fn bulk_action(&self, operation: &BulkOperation, item: &ItemRef, state: &AppState) -> BulkAction {
        match operation {
            BulkOperation::Download => {
                let listed = state
                    .listing()
                    .and_then(|listing| listing.file(item.id()))
                    .map(|file| file.name.as_str());
                BulkAction::Download {
                    dest: self.download_dir.join(download_name(listed, item.id())),
                }
            }
            BulkOperation::Trash => BulkAction::Trash,
            BulkOperation::Delete => BulkAction::Delete,
            BulkOperation::Star => BulkAction::Star,
            BulkOperation::Move { target } => BulkAction::Move {
                target: target.clone(),
            },
        }
    }
}

fn upload_command(start: UploadStart) -> EngineCommand {
    EngineCommand::Upload {
        task_id: start.task_id,
        attempt: start.attempt,
        request: UploadRequest {
            path: start.source.path,
            file_name: start.display_name,
            folder: start.folder,
        },
    }
}

fn mutation_request(mutation: &Mutation) -> MutationRequest {
    match mutation {
        Mutation::CreateFolder { name, parent } => MutationRequest::CreateFolder {
            name: name.clone(),
            parent: parent.clone(),
        },
        Mutation::Rename {
            item: ItemRef::File(id),
            name,
        } => MutationRequest::RenameFile {
            id: id.clone(),
            name: name.clone(),
        },
        Mutation::Rename {
            item: ItemRef::Folder(id),
            name,
        } => MutationRequest::RenameFolder {
            id: id.clone(),
            name: name.clone(),
        },
    }
}

/// Final path component of the listed name, or the id when unlisted.
fn download_name(listed: Option<&str>, id: &str) -> String {
    listed
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.to_string())
}

fn remote_target(item: &ItemRef) -> RemoteTarget {
    match item {
        ItemRef::File(id) => RemoteTarget::File(id.clone()),
        ItemRef::Folder(id) => RemoteTarget::Folder(id.clone()),
    }
}

fn item_ref(target: RemoteTarget) -> ItemRef {
    match target {
        RemoteTarget::File(id) => ItemRef::File(id),
        RemoteTarget::Folder(id) => ItemRef::Folder(id),
    }
}

/// User-facing text for a gateway failure. Server rejections already carry
/// a readable message.
pub(crate) fn describe(err: &GatewayError) -> String {
    match err.kind {
        FailureKind::Rejected => err.message.clone(),
        _ => err.to_string(),
    }
}

fn timestamp(updated: Option<DateTime<Utc>>, created: Option<DateTime<Utc>>) -> DateTime<Utc> {
    updated.or(created).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn map_file(file: RemoteFile) -> FileEntry {
    FileEntry {
        updated_at: timestamp(file.updated_at, file.created_at),
        id: file.id,
        name: file.original_name,
        mime_type: file.mime_type,
        extension: file.extension,
        size: file.size,
        starred: file.is_starred,
        tags: file.tags,
        folder: file.folder,
        path: file.path,
    }
}

pub(crate) fn map_folder(folder: RemoteFolder) -> FolderEntry {
    FolderEntry {
        updated_at: timestamp(folder.updated_at, None),
        id: folder.id,
        name: folder.name,
        parent: folder.parent_folder,
    }
}

fn map_listing(folder: Option<String>, contents: DriveContents) -> Listing {
    Listing {
        folder,
        folders: contents.folders.into_iter().map(map_folder).collect(),
        files: contents.files.into_iter().map(map_file).collect(),
        breadcrumb: contents.breadcrumb.into_iter().map(map_folder).collect(),
    }
}

fn map_search(results: SearchResults) -> SearchHits {
    SearchHits {
        files: results.files.into_iter().map(map_file).collect(),
        folders: results.folders.into_iter().map(map_folder).collect(),
    }
}
