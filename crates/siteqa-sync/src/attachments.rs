//! Row attachments: two-phase upload via signed storage URLs.

use std::sync::Arc;

use futures::future::join_all;
use futures::{stream, StreamExt};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use siteqa_core::upload::{
    AttachmentLimits, FileOutcome, FileSpec, UploadReport, UploadStatus, UploadTargets,
};
use tracing::{debug, info, warn};

use crate::client::{check, ApiClient};
use crate::SyncError;

/// Bytes per streamed body chunk; progress is reported once per chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Per-file progress callback: `(filename, status)`.
pub type Progress = Arc<dyn Fn(&str, &UploadStatus) + Send + Sync>;

/// A file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub spec: FileSpec,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            spec: FileSpec::new(filename, data.len() as u64),
            data,
        }
    }
}

/// An attachment already linked to a row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(default, alias = "name")]
    pub file_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, alias = "type")]
    pub content_type: Option<String>,
}

#[derive(Deserialize)]
struct AttachmentList {
    #[serde(default)]
    attachments: Vec<Attachment>,
}

fn attachments_path<'a>(project: &'a str, asset_id: &'a str, tail: &'a str) -> [&'a str; 6] {
    ["projects", project, "assets", asset_id, "attachments", tail]
}

impl ApiClient {
    pub async fn list_attachments(&self, asset_id: &str, row_id: &str) -> Result<Vec<Attachment>, SyncError> {
        let req = self
            .request(Method::GET, &["assets", asset_id, "attachments"])
            .query(&[("rowId", row_id)]);
        let list: AttachmentList = self.send_json(req).await?;
        Ok(list.attachments)
    }

    pub async fn delete_attachment(&self, asset_id: &str, row_id: &str, attachment_id: &str) -> Result<(), SyncError> {
        let req = self
            .request(Method::DELETE, &["assets", asset_id, "attachments", attachment_id])
            .query(&[("rowId", row_id)]);
        self.send_unit(req).await?;
        info!(asset_id, row_id, attachment_id, "attachment deleted");
        Ok(())
    }

    /// Phase one: one signed upload URL per filename.
    pub async fn request_upload_urls(
        &self,
        project: &str,
        asset_id: &str,
        row_id: &str,
        filenames: &[&str],
    ) -> Result<UploadTargets, SyncError> {
        let body = json!({"filenames": filenames, "rowId": row_id});
        let req = self
            .request(Method::POST, &attachments_path(project, asset_id, "sas"))
            .json(&body);
        self.send_json(req).await
    }

    /// PUT `data` to a signed blob URL, streaming in [`CHUNK_SIZE`] pieces.
    ///
    /// `progress` receives `(sent, total)` as each chunk is handed to the
    /// transport.
    pub async fn put_blob<F>(&self, url: &str, data: Vec<u8>, progress: F) -> Result<(), SyncError>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let total = data.len() as u64;
        let chunks: Vec<Vec<u8>> = data.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let body = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
            Ok::<_, std::io::Error>(chunk)
        });
        let resp = self
            .blob()
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Phase three: record the files that reached storage.
    ///
    /// Returns `true` when the server answered 207 (only some recorded).
    pub async fn complete_upload(
        &self,
        project: &str,
        asset_id: &str,
        row_id: &str,
        files: &[FileSpec],
    ) -> Result<bool, SyncError> {
        let body = json!({"files": files, "rowId": row_id});
        let req = self
            .request(Method::POST, &attachments_path(project, asset_id, "complete"))
            .json(&body);
        let status = self.send_unit(req).await?;
        Ok(status == StatusCode::MULTI_STATUS.as_u16())
    }

    /// Upload files to a row that already holds `existing` attachments:
    /// screen against the limits, fetch URLs, PUT the accepted files
    /// concurrently, then complete for the files that landed.
    ///
    /// A full row and URL issuance failures fail the whole batch. Files
    /// over the size limit or past the row's capacity are listed in
    /// `rejected` and the rest still upload. Every uploaded file gets its
    /// own outcome in the report.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_attachments(
        &self,
        project: &str,
        asset_id: &str,
        row_id: &str,
        existing: usize,
        files: Vec<UploadFile>,
        limits: AttachmentLimits,
        progress: Progress,
    ) -> Result<UploadReport, SyncError> {
        let specs: Vec<FileSpec> = files.iter().map(|f| f.spec.clone()).collect();
        let screening = limits.screen(existing, &specs)?;
        for rejected in &screening.rejected {
            warn!(asset_id, row_id, file = %rejected.file.filename, reason = %rejected.reason, "attachment skipped");
            progress(&rejected.file.filename, &UploadStatus::Failed(rejected.reason.to_string()));
        }
        let files: Vec<UploadFile> = files
            .into_iter()
            .enumerate()
            .filter(|(index, _)| screening.accepted.contains(index))
            .map(|(_, file)| file)
            .collect();
        if files.is_empty() {
            return Ok(UploadReport {
                rejected: screening.rejected,
                ..Default::default()
            });
        }
        let specs: Vec<FileSpec> = files.iter().map(|f| f.spec.clone()).collect();

        let filenames: Vec<&str> = specs.iter().map(|f| f.filename.as_str()).collect();
        let targets = self
            .request_upload_urls(project, asset_id, row_id, &filenames)
            .await?;

        let uploads = files.into_iter().map(|file| {
            let url = targets
                .uploads
                .iter()
                .find(|t| t.filename == file.spec.filename)
                .map(|t| t.upload_url.clone());
            let progress = progress.clone();
            async move {
                let name = file.spec.filename.clone();
                let status = match url {
                    None => UploadStatus::Failed(SyncError::MissingUploadUrl(name.clone()).to_string()),
                    Some(url) => {
                        let tick = progress.clone();
                        let tick_name = name.clone();
                        let sent = self
                            .put_blob(&url, file.data, move |sent, total| {
                                tick(&tick_name, &UploadStatus::Uploading { sent, total })
                            })
                            .await;
                        match sent {
                            Ok(()) => UploadStatus::Done,
                            Err(e) => {
                                warn!(file = %name, error = %e, "blob upload failed");
                                UploadStatus::Failed(e.to_string())
                            }
                        }
                    }
                };
                progress(&name, &status);
                FileOutcome {
                    file: file.spec,
                    status,
                }
            }
        });
        let outcomes = join_all(uploads).await;

        let mut report = UploadReport {
            files: outcomes,
            rejected: screening.rejected,
            ..Default::default()
        };
        let landed: Vec<FileSpec> = report.succeeded().cloned().collect();
        if !landed.is_empty() {
            match self.complete_upload(project, asset_id, row_id, &landed).await {
                Ok(partial) => {
                    if partial {
                        warn!(asset_id, row_id, "attachment completion was partial");
                    }
                    report.partial_completion = partial;
                }
                Err(e) => {
                    warn!(asset_id, row_id, error = %e, "files uploaded but records not updated");
                    report.completion_warning = Some(e.to_string());
                }
            }
        }
        debug!(asset_id, row_id, uploaded = landed.len(), "upload finished");
        info!(
            asset_id,
            row_id,
            succeeded = report.success_count(),
            total = report.files.len(),
            "attachments uploaded"
        );
        Ok(report)
    }
}
