use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio_util::io::ReaderStream;

use crate::{EngineEvent, FailureKind, GatewayError};

/// Local file to send, plus the folder it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub folder: Option<String>,
}

impl UploadRequest {
    /// Uses the path's final component as the upload name.
    pub fn from_path(path: impl Into<PathBuf>, folder: Option<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            folder,
        }
    }
}

/// Receives byte counts as upload chunks are handed to the transport.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, sent: u64, total: u64);
}

/// Forwards progress of one upload attempt to the engine event channel.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
    task_id: u64,
    attempt: u32,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>, task_id: u64, attempt: u32) -> Self {
        Self {
            tx,
            task_id,
            attempt,
        }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn progress(&self, sent: u64, total: u64) {
        let _ = self.tx.send(EngineEvent::UploadProgress {
            task_id: self.task_id,
            attempt: self.attempt,
            percent: percent(sent, total),
        });
    }
}

/// `round(sent * 100 / total)`, clamped to 100. An empty total counts as done.
pub(crate) fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = (u128::from(sent) * 100 + u128::from(total) / 2) / u128::from(total);
    scaled.min(100) as u8
}

/// Builds a multipart form whose `file` part streams the local file in
/// `chunk_size` pieces, reporting to `sink` as each piece is consumed.
pub(crate) async fn file_form(
    request: &UploadRequest,
    sink: Arc<dyn ProgressSink>,
    chunk_size: usize,
) -> Result<Form, GatewayError> {
    let file = tokio::fs::File::open(&request.path)
        .await
        .map_err(|err| local_io(&request.path, err))?;
    let total = file
        .metadata()
        .await
        .map_err(|err| local_io(&request.path, err))?
        .len();

    let sent = Arc::new(AtomicU64::new(0));
    let stream = ReaderStream::with_capacity(file, chunk_size.max(1)).map(move |chunk| {
        if let Ok(bytes) = &chunk {
            let so_far = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
            sink.progress(so_far, total);
        }
        chunk
    });

    let part = Part::stream_with_length(Body::wrap_stream(stream), total)
        .file_name(request.file_name.clone())
        .mime_str(guess_mime(&request.file_name))
        .map_err(|err| GatewayError::new(FailureKind::LocalIo, err.to_string()))?;

    let mut form = Form::new().part("file", part);
    if let Some(folder) = &request.folder {
        form = form.text("folder", folder.clone());
    }
    Ok(form)
}

fn local_io(path: &Path, err: std::io::Error) -> GatewayError {
    GatewayError::new(
        FailureKind::LocalIo,
        format!("{}: {err}", path.display()),
    )
}

fn guess_mime(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}
