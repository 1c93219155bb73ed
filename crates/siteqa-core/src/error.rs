use thiserror::Error;

use crate::itp::ApprovalAction;
use crate::role::Role;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown plan type: {0}")]
    UnknownPlanType(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("unknown team preset: {0}")]
    UnknownPreset(String),

    #[error("unknown approval action: {0}")]
    UnknownAction(String),

    #[error("role {role} may not {action}")]
    PermissionDenied { role: Role, action: ApprovalAction },

    #[error("cannot {action} point {point_id}: {state}")]
    InvalidTransition {
        point_id: String,
        action: ApprovalAction,
        state: &'static str,
    },

    #[error("point {0} changed since the action was proposed")]
    StaleTransition(String),

    #[error("no inspection point with id {0}")]
    UnknownPoint(String),

    #[error("point {point_id} is not {expected}")]
    PointKind {
        point_id: String,
        expected: &'static str,
    },

    #[error("at most {max} attachments allowed per row")]
    TooManyFiles { max: usize },

    #[error("file {name} is {size} bytes, limit is {max}")]
    FileTooLarge { name: String, size: u64, max: u64 },
}
