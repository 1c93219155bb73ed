//! HTTP client for the project API: plans and approval workflows, team
//! membership, registers, plan sections, and two-phase attachment uploads.

mod error;
pub use error::SyncError;

mod client;
pub use client::{ApiClient, ClientConfig, DEFAULT_TIMEOUT};

mod plans;
pub use plans::{PlanBoard, PLAN_ASSET_TYPE, WORKFLOW_ASSET_TYPE};

mod team;
pub use team::BatchReport;

mod registers;

mod sections;
pub use sections::SectionSaveReport;

mod attachments;
pub use attachments::{Attachment, Progress, UploadFile, CHUNK_SIZE};

#[cfg(test)]
mod stub;
