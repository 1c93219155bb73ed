pub mod asset;
pub mod error;
pub mod itp;
pub mod plan;
pub mod project;
pub mod register;
pub mod role;
pub mod section;
pub mod status;
pub mod team;
pub mod upload;

pub use asset::{AssetList, RawAsset, WorkflowAsset};
pub use error::CoreError;
pub use itp::{ApprovalAction, ApprovalTracker, CheckSlot, InspectionPointApproval, ItpTemplate, Transition};
pub use plan::{ClientStatus, ManagementPlan, PlanSummary, PlanType, transform_assets_to_plans};
pub use project::{ComplianceConfig, Project};
pub use role::{Permission, Role};
pub use section::{PlanSection, SectionEditor, SectionPatch};
pub use status::{StatusStyle, Styled, Tone};
pub use team::{Preset, TeamMember, TeamPermission};
pub use upload::{AttachmentLimits, FileSpec, Rejected, Screening, UploadReport};
