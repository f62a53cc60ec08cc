use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use drive_logging::{drive_debug, drive_warn};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::types::VersionHistory;
use crate::upload::{file_form, ProgressSink, UploadRequest};
use crate::{
    AiAnswer, AutoTags, DriveContents, FailureKind, FilePreview, FileVersion, GatewayError,
    GeneratedDocument, RemoteFile, RemoteFolder, SearchResults, ShareStatus, SharedFile,
    StorageAnalytics, TagCount,
};

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub chunk_size: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(600),
            chunk_size: 64 * 1024,
        }
    }
}

/// Calls the coordinators depend on. Everything else lives on `ReqwestGateway`.
#[async_trait::async_trait]
pub trait DriveGateway: Send + Sync {
    async fn drive_contents(&self, folder: Option<&str>) -> Result<DriveContents, GatewayError>;

    async fn breadcrumb(&self, folder: &str) -> Result<Vec<RemoteFolder>, GatewayError>;

    async fn search(&self, query: &str) -> Result<SearchResults, GatewayError>;

    async fn upload_file(
        &self,
        request: &UploadRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<RemoteFile, GatewayError>;

    async fn download_file(&self, file_id: &str) -> Result<Bytes, GatewayError>;

    async fn move_file(&self, file_id: &str, target: Option<&str>) -> Result<(), GatewayError>;

    async fn rename_file(&self, file_id: &str, name: &str) -> Result<(), GatewayError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), GatewayError>;

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<RemoteFolder, GatewayError>;

    async fn rename_folder(&self, folder_id: &str, name: &str) -> Result<(), GatewayError>;

    async fn delete_folder(&self, folder_id: &str) -> Result<(), GatewayError>;

    async fn toggle_star(&self, file_id: &str) -> Result<(), GatewayError>;

    async fn move_to_trash(&self, file_id: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGateway {
    settings: GatewaySettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| GatewayError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| GatewayError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Appends percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::new(FailureKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request and returns the envelope once status and `success` check out.
    async fn execute(&self, request: RequestBuilder) -> Result<Value, GatewayError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        let body = serde_json::from_str::<Value>(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(envelope_message)
                .unwrap_or_else(|| status.to_string());
            drive_warn!("gateway: http status {} ({message})", status.as_u16());
            return Err(GatewayError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        let body = body.ok_or_else(|| {
            GatewayError::new(FailureKind::Decode, "response body is not json")
        })?;
        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let message = envelope_message(&body).unwrap_or_else(|| "request rejected".to_string());
            return Err(GatewayError::new(FailureKind::Rejected, message));
        }
        Ok(body)
    }

    /// Decodes the envelope's `data` member.
    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let mut body = self.execute(request).await?;
        let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        decode(data)
    }

    /// Decodes the whole envelope; the AI routes put their payload at the top level.
    async fn flat<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        decode(self.execute(request).await?)
    }

    async fn unit(&self, request: RequestBuilder) -> Result<(), GatewayError> {
        self.execute(request).await.map(|_| ())
    }

    async fn bytes(&self, request: RequestBuilder) -> Result<Bytes, GatewayError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(envelope_message)
                .unwrap_or_else(|| status.to_string());
            return Err(GatewayError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        response.bytes().await.map_err(map_reqwest_error)
    }

    async fn multipart<T: DeserializeOwned>(
        &self,
        url: Url,
        request: &UploadRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<T, GatewayError> {
        let form = file_form(request, sink, self.settings.chunk_size).await?;
        let builder = self
            .client
            .post(url)
            .timeout(self.settings.upload_timeout)
            .multipart(form);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                drive_debug!("gateway: upload of {} cancelled", request.file_name);
                Err(GatewayError::new(FailureKind::Cancelled, "upload cancelled"))
            }
            result = self.data::<T>(builder) => result,
        }
    }

    pub async fn all_folders(&self) -> Result<Vec<RemoteFolder>, GatewayError> {
        self.data(self.client.get(self.url(&["folders"])?)).await
    }

    pub async fn enable_share(&self, file_id: &str) -> Result<ShareStatus, GatewayError> {
        let url = self.url(&["share", file_id, "enable"])?;
        self.data(self.client.post(url)).await
    }

    pub async fn disable_share(&self, file_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["share", file_id, "disable"])?;
        self.unit(self.client.post(url)).await
    }

    pub async fn share_status(&self, file_id: &str) -> Result<ShareStatus, GatewayError> {
        let url = self.url(&["share", file_id, "status"])?;
        self.data(self.client.get(url)).await
    }

    pub async fn shared_file(&self, share_link: &str) -> Result<SharedFile, GatewayError> {
        let url = self.url(&["share", share_link])?;
        self.data(self.client.get(url)).await
    }

    pub async fn versions(&self, file_id: &str) -> Result<Vec<FileVersion>, GatewayError> {
        let url = self.url(&["versions", file_id])?;
        let history: VersionHistory = self.data(self.client.get(url)).await?;
        Ok(history.versions)
    }

    pub async fn upload_version(
        &self,
        file_id: &str,
        request: &UploadRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Value, GatewayError> {
        let url = self.url(&["versions", file_id])?;
        let request = UploadRequest {
            folder: None,
            ..request.clone()
        };
        self.multipart(url, &request, sink, cancel).await
    }

    pub async fn download_version(
        &self,
        file_id: &str,
        version: u32,
    ) -> Result<Bytes, GatewayError> {
        let version = version.to_string();
        let url = self.url(&["versions", file_id, &version, "download"])?;
        self.bytes(self.client.get(url)).await
    }

    pub async fn restore_version(&self, file_id: &str, version: u32) -> Result<(), GatewayError> {
        let version = version.to_string();
        let url = self.url(&["versions", file_id, &version, "restore"])?;
        self.unit(self.client.post(url)).await
    }

    pub async fn ask(
        &self,
        file_path: &str,
        question: &str,
        file_id: Option<&str>,
    ) -> Result<AiAnswer, GatewayError> {
        let body = json!({ "filePath": file_path, "question": question, "fileId": file_id });
        self.flat(self.client.post(self.url(&["ai", "ask"])?).json(&body))
            .await
    }

    pub async fn ask_multi(
        &self,
        file_paths: &[String],
        question: &str,
    ) -> Result<AiAnswer, GatewayError> {
        let body = json!({ "filePaths": file_paths, "question": question });
        self.flat(self.client.post(self.url(&["ai", "ask-multi"])?).json(&body))
            .await
    }

    pub async fn summarize(
        &self,
        file_path: &str,
        file_id: Option<&str>,
    ) -> Result<String, GatewayError> {
        #[derive(serde::Deserialize)]
        struct Summary {
            #[serde(default)]
            summary: String,
        }
        let body = json!({ "filePath": file_path, "fileId": file_id });
        let summary: Summary = self
            .flat(self.client.post(self.url(&["ai", "summarize"])?).json(&body))
            .await?;
        Ok(summary.summary)
    }

    /// Never fails: an unreachable AI service reports `false`.
    pub async fn ai_available(&self) -> bool {
        let request = match self.url(&["ai", "health"]) {
            Ok(url) => self.client.get(url),
            Err(_) => return false,
        };
        self.execute(request).await.is_ok()
    }

    pub async fn auto_tag(
        &self,
        file_path: &str,
        file_id: Option<&str>,
        max_tags: u32,
    ) -> Result<AutoTags, GatewayError> {
        let body = json!({ "filePath": file_path, "fileId": file_id, "maxTags": max_tags });
        self.flat(self.client.post(self.url(&["ai", "auto-tag"])?).json(&body))
            .await
    }

    pub async fn generate_document(
        &self,
        file_path: &str,
        doc_type: &str,
        file_id: Option<&str>,
    ) -> Result<GeneratedDocument, GatewayError> {
        let body = json!({ "filePath": file_path, "docType": doc_type, "fileId": file_id });
        self.flat(self.client.post(self.url(&["ai", "generate-doc"])?).json(&body))
            .await
    }

    pub async fn starred(&self) -> Result<Vec<RemoteFile>, GatewayError> {
        self.data(self.client.get(self.url(&["features", "starred"])?))
            .await
    }

    pub async fn trash(&self) -> Result<Vec<RemoteFile>, GatewayError> {
        self.data(self.client.get(self.url(&["features", "trash"])?))
            .await
    }

    pub async fn restore_from_trash(&self, file_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["features", "restore", file_id])?;
        self.unit(self.client.patch(url)).await
    }

    pub async fn delete_permanently(&self, file_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["features", "trash", file_id])?;
        self.unit(self.client.delete(url)).await
    }

    pub async fn empty_trash(&self) -> Result<(), GatewayError> {
        self.unit(self.client.delete(self.url(&["features", "trash"])?))
            .await
    }

    pub async fn tags(&self) -> Result<Vec<TagCount>, GatewayError> {
        self.data(self.client.get(self.url(&["features", "tags"])?))
            .await
    }

    pub async fn files_by_tag(&self, tag: &str) -> Result<Vec<RemoteFile>, GatewayError> {
        let url = self.url(&["features", "tags", tag])?;
        self.data(self.client.get(url)).await
    }

    pub async fn set_tags(&self, file_id: &str, tags: &[String]) -> Result<(), GatewayError> {
        let url = self.url(&["features", "tags", file_id])?;
        self.unit(self.client.patch(url).json(&json!({ "tags": tags })))
            .await
    }

    pub async fn analytics(&self) -> Result<StorageAnalytics, GatewayError> {
        self.data(self.client.get(self.url(&["features", "analytics"])?))
            .await
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<RemoteFile>, GatewayError> {
        let mut url = self.url(&["features", "recent"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.data(self.client.get(url)).await
    }

    pub async fn preview(&self, file_id: &str) -> Result<FilePreview, GatewayError> {
        let url = self.url(&["features", "preview", file_id])?;
        self.data(self.client.get(url)).await
    }
}

#[async_trait::async_trait]
impl DriveGateway for ReqwestGateway {
    async fn drive_contents(&self, folder: Option<&str>) -> Result<DriveContents, GatewayError> {
        let mut url = self.url(&["files", "drive"])?;
        if let Some(folder) = folder {
            url.query_pairs_mut().append_pair("folder", folder);
        }
        self.data(self.client.get(url)).await
    }

    async fn breadcrumb(&self, folder: &str) -> Result<Vec<RemoteFolder>, GatewayError> {
        let url = self.url(&["folders", folder, "breadcrumb"])?;
        self.data(self.client.get(url)).await
    }

    async fn search(&self, query: &str) -> Result<SearchResults, GatewayError> {
        let mut url = self.url(&["features", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        self.data(self.client.get(url)).await
    }

    async fn upload_file(
        &self,
        request: &UploadRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<RemoteFile, GatewayError> {
        let url = self.url(&["files"])?;
        self.multipart(url, request, sink, cancel).await
    }

    async fn download_file(&self, file_id: &str) -> Result<Bytes, GatewayError> {
        let url = self.url(&["files", file_id, "download"])?;
        self.bytes(self.client.get(url)).await
    }

    async fn move_file(&self, file_id: &str, target: Option<&str>) -> Result<(), GatewayError> {
        let url = self.url(&["files", file_id, "move"])?;
        self.unit(self.client.patch(url).json(&json!({ "targetFolder": target })))
            .await
    }

    async fn rename_file(&self, file_id: &str, name: &str) -> Result<(), GatewayError> {
        let url = self.url(&["files", file_id, "rename"])?;
        self.unit(self.client.patch(url).json(&json!({ "name": name })))
            .await
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["files", file_id])?;
        self.unit(self.client.delete(url)).await
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<RemoteFolder, GatewayError> {
        let url = self.url(&["folders"])?;
        self.data(
            self.client
                .post(url)
                .json(&json!({ "name": name, "parentFolder": parent })),
        )
        .await
    }

    async fn rename_folder(&self, folder_id: &str, name: &str) -> Result<(), GatewayError> {
        let url = self.url(&["folders", folder_id])?;
        self.unit(self.client.patch(url).json(&json!({ "name": name })))
            .await
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["folders", folder_id])?;
        self.unit(self.client.delete(url)).await
    }

    async fn toggle_star(&self, file_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["features", "star", file_id])?;
        self.unit(self.client.patch(url)).await
    }

    async fn move_to_trash(&self, file_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&["features", "trash", file_id])?;
        self.unit(self.client.patch(url)).await
    }
}

fn envelope_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|err| GatewayError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return GatewayError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return GatewayError::new(FailureKind::Decode, err.to_string());
    }
    GatewayError::new(FailureKind::Network, err.to_string())
}
