//! Row attachment uploads.
//!
//! Uploads are two-phase: the backend hands out one signed URL per file,
//! the client PUTs bytes straight to storage, then reports the files that
//! landed. Types here cover validation and the per-file bookkeeping; the
//! HTTP side lives in the sync crate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const MAX_FILES: usize = 3;
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    pub max_files: usize,
    pub max_bytes: u64,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_bytes: MAX_FILE_BYTES,
        }
    }
}

impl AttachmentLimits {
    /// Slots left on a row that already holds `existing` attachments.
    pub fn remaining(&self, existing: usize) -> usize {
        self.max_files.saturating_sub(existing)
    }

    /// Decide file by file, in order, what may go onto a row that already
    /// holds `existing` attachments.
    ///
    /// Oversized files are skipped and the rest still go. Once the row is
    /// full every later file is turned away. A row with no room left fails
    /// outright.
    pub fn screen(&self, existing: usize, files: &[FileSpec]) -> Result<Screening, CoreError> {
        if !files.is_empty() && self.remaining(existing) == 0 {
            return Err(CoreError::TooManyFiles { max: self.max_files });
        }
        let mut screening = Screening::default();
        for (index, file) in files.iter().enumerate() {
            let reason = if existing + screening.accepted.len() >= self.max_files {
                CoreError::TooManyFiles { max: self.max_files }
            } else if file.size > self.max_bytes {
                CoreError::FileTooLarge {
                    name: file.filename.clone(),
                    size: file.size,
                    max: self.max_bytes,
                }
            } else {
                screening.accepted.push(index);
                continue;
            };
            screening.rejected.push(Rejected {
                file: file.clone(),
                reason,
            });
        }
        Ok(screening)
    }
}

/// Outcome of [`AttachmentLimits::screen`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screening {
    /// Indices into the screened slice, in order.
    pub accepted: Vec<usize>,
    pub rejected: Vec<Rejected>,
}

/// A file left out of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub file: FileSpec,
    pub reason: CoreError,
}

/// A file as reported to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl FileSpec {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            size,
            content_type,
        }
    }
}

/// MIME type from the file extension; unknown extensions are octet streams.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// One signed destination from `POST .../attachments/sas`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub filename: String,
    pub upload_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadTargets {
    #[serde(default)]
    pub uploads: Vec<UploadTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading { sent: u64, total: u64 },
    Done,
    Failed(String),
}

impl UploadStatus {
    /// Whole-percent progress, 100 once done.
    pub fn percent(&self) -> u8 {
        match self {
            UploadStatus::Pending | UploadStatus::Failed(_) => 0,
            UploadStatus::Uploading { total: 0, .. } => 0,
            UploadStatus::Uploading { sent, total } => {
                ((*sent.min(total) * 100) / *total) as u8
            }
            UploadStatus::Done => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file: FileSpec,
    pub status: UploadStatus,
}

/// Result of one multi-file upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub files: Vec<FileOutcome>,
    /// The completion call answered 207: only some files were recorded.
    pub partial_completion: bool,
    /// Bytes landed in storage but the completion call failed.
    pub completion_warning: Option<String>,
    /// Files skipped before upload.
    pub rejected: Vec<Rejected>,
}

impl UploadReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileSpec> {
        self.files
            .iter()
            .filter(|o| o.status == UploadStatus::Done)
            .map(|o| &o.file)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&FileSpec, &str)> {
        self.files.iter().filter_map(|o| match &o.status {
            UploadStatus::Failed(reason) => Some((&o.file, reason.as_str())),
            _ => None,
        })
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.files.is_empty()
            && self.success_count() == self.files.len()
            && !self.partial_completion
            && self.completion_warning.is_none()
            && self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_count_existing_attachments() {
        let limits = AttachmentLimits::default();
        let files: Vec<FileSpec> = (0..3).map(|i| FileSpec::new(format!("f{i}.pdf"), 10)).collect();

        let fresh = limits.screen(0, &files).unwrap();
        assert_eq!(fresh.accepted, vec![0, 1, 2]);
        assert!(fresh.rejected.is_empty());

        let partly_full = limits.screen(2, &files).unwrap();
        assert_eq!(partly_full.accepted, vec![0]);
        let turned_away: Vec<_> = partly_full.rejected.iter().map(|r| r.file.filename.as_str()).collect();
        assert_eq!(turned_away, vec!["f1.pdf", "f2.pdf"]);
        assert_eq!(partly_full.rejected[0].reason, CoreError::TooManyFiles { max: 3 });

        assert_eq!(limits.screen(3, &files).unwrap_err(), CoreError::TooManyFiles { max: 3 });
        assert!(limits.screen(3, &[]).unwrap().accepted.is_empty());
    }

    #[test]
    fn oversized_files_are_skipped_individually() {
        let files = vec![
            FileSpec::new("ok.png", 1024),
            FileSpec::new("huge.pdf", MAX_FILE_BYTES + 1),
            FileSpec::new("edge.pdf", MAX_FILE_BYTES),
        ];
        let screening = AttachmentLimits::default().screen(0, &files).unwrap();
        assert_eq!(screening.accepted, vec![0, 2]);
        assert_eq!(screening.rejected.len(), 1);
        assert!(matches!(
            screening.rejected[0].reason,
            CoreError::FileTooLarge { ref name, .. } if name == "huge.pdf"
        ));
    }

    #[test]
    fn oversized_file_does_not_use_a_slot() {
        let files = vec![
            FileSpec::new("huge.pdf", MAX_FILE_BYTES + 1),
            FileSpec::new("a.pdf", 1),
            FileSpec::new("b.pdf", 1),
        ];
        let screening = AttachmentLimits::default().screen(1, &files).unwrap();
        assert_eq!(screening.accepted, vec![1, 2]);
    }

    #[test]
    fn content_types() {
        assert_eq!(FileSpec::new("Report.PDF", 1).content_type, "application/pdf");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn completion_body_shape() {
        let json = serde_json::to_value(FileSpec::new("a.png", 5)).unwrap();
        assert_eq!(json, serde_json::json!({"filename": "a.png", "size": 5, "type": "image/png"}));
    }

    #[test]
    fn progress_percent() {
        assert_eq!(UploadStatus::Uploading { sent: 50, total: 200 }.percent(), 25);
        assert_eq!(UploadStatus::Uploading { sent: 0, total: 0 }.percent(), 0);
        assert_eq!(UploadStatus::Done.percent(), 100);
    }

    #[test]
    fn report_partitions_outcomes() {
        let report = UploadReport {
            files: vec![
                FileOutcome {
                    file: FileSpec::new("a.pdf", 1),
                    status: UploadStatus::Done,
                },
                FileOutcome {
                    file: FileSpec::new("b.pdf", 1),
                    status: UploadStatus::Failed("403".into()),
                },
            ],
            ..Default::default()
        };
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failed().next().map(|(f, r)| (f.filename.as_str(), r)), Some(("b.pdf", "403")));
        assert!(!report.all_succeeded());
    }
}
