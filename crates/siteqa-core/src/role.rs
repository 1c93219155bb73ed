//! Project roles and the permissions they carry.
//!
//! Role codes match `roles.code` in the backend. The permission table is
//! fixed and also gates ITP sign-offs: the check, QA approval and hold
//! point release permissions belong to the roles that sign those columns.
//! `admin` holds every other permission.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Subcontractor,
    SiteEngineer,
    QaManager,
    Superintendent,
    Admin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Client,
        Role::Subcontractor,
        Role::SiteEngineer,
        Role::QaManager,
        Role::Superintendent,
        Role::Admin,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Subcontractor => "subcontractor",
            Role::SiteEngineer => "site_engineer",
            Role::QaManager => "qa_manager",
            Role::Superintendent => "superintendent",
            Role::Admin => "admin",
        }
    }

    /// Human label, e.g. `site engineer`.
    pub fn label(self) -> String {
        self.code().replace('_', " ")
    }

    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Client => &[
                ItpView,
                ItpApprove,
                HoldPointRelease,
                LotView,
                DocumentView,
                NcrView,
                ApprovalView,
                ApprovalDecide,
                PlanView,
                PlanApprove,
            ],
            Role::Subcontractor => &[
                ItpView,
                InspectionCheckSubcontractor,
                InspectionUpload,
                HoldPointRequest,
                WitnessPointRequest,
                LotView,
                LotEdit,
                DocumentView,
                DocumentUpload,
                NcrView,
            ],
            Role::SiteEngineer => &[
                ItpView,
                ItpEdit,
                InspectionCheckEngineer,
                InspectionUpload,
                HoldPointRequest,
                WitnessPointRequest,
                WitnessPointNotify,
                LotView,
                LotEdit,
                LotCreate,
                DocumentView,
                DocumentUpload,
                NcrView,
                NcrCreate,
                ApprovalView,
                PlanView,
            ],
            Role::QaManager => &[
                ItpView,
                ItpEdit,
                ItpApprove,
                InspectionApproveQa,
                InspectionUpload,
                HoldPointRequest,
                HoldPointRelease,
                WitnessPointRequest,
                WitnessPointNotify,
                LotView,
                LotEdit,
                LotCreate,
                DocumentView,
                DocumentUpload,
                NcrView,
                NcrCreate,
                NcrResolve,
                ApprovalView,
                ApprovalDecide,
                PlanView,
                PlanApprove,
            ],
            Role::Superintendent => &[
                ItpView,
                ItpApprove,
                InspectionApproveQa,
                HoldPointRelease,
                LotView,
                DocumentView,
                NcrView,
                ApprovalView,
                ApprovalDecide,
                PlanView,
                PlanApprove,
            ],
            Role::Admin => &[
                ItpView,
                ItpApprove,
                ItpEdit,
                InspectionUpload,
                HoldPointRequest,
                WitnessPointRequest,
                WitnessPointNotify,
                LotView,
                LotEdit,
                LotCreate,
                DocumentView,
                DocumentUpload,
                NcrView,
                NcrCreate,
                NcrResolve,
                ApprovalView,
                ApprovalDecide,
                PlanView,
                PlanApprove,
            ],
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Which portal a member with this role lands in.
    pub fn portal(self) -> Portal {
        match self {
            Role::Client => Portal::Client,
            Role::Subcontractor => Portal::Subcontractor,
            _ => Portal::Main,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Role::ALL
            .into_iter()
            .find(|r| r.code() == normalized)
            .ok_or_else(|| CoreError::UnknownRole(s.to_string()))
    }
}

/// True if any of `roles` carries `permission`.
pub fn has_permission(roles: &[Role], permission: Permission) -> bool {
    roles.iter().any(|r| r.has_permission(permission))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Client,
    Subcontractor,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ItpView,
    ItpApprove,
    ItpEdit,
    InspectionCheckSubcontractor,
    InspectionCheckEngineer,
    InspectionApproveQa,
    InspectionUpload,
    HoldPointRequest,
    HoldPointRelease,
    WitnessPointRequest,
    WitnessPointNotify,
    LotView,
    LotEdit,
    LotCreate,
    DocumentView,
    DocumentUpload,
    NcrView,
    NcrCreate,
    NcrResolve,
    ApprovalView,
    ApprovalDecide,
    PlanView,
    PlanApprove,
}

impl Permission {
    /// Sign-offs tied to the role that owns the column, never granted to
    /// `admin`.
    pub const SIGN_OFFS: [Permission; 4] = [
        Permission::InspectionCheckSubcontractor,
        Permission::InspectionCheckEngineer,
        Permission::InspectionApproveQa,
        Permission::HoldPointRelease,
    ];

    pub const ALL: [Permission; 23] = [
        Permission::ItpView,
        Permission::ItpApprove,
        Permission::ItpEdit,
        Permission::InspectionCheckSubcontractor,
        Permission::InspectionCheckEngineer,
        Permission::InspectionApproveQa,
        Permission::InspectionUpload,
        Permission::HoldPointRequest,
        Permission::HoldPointRelease,
        Permission::WitnessPointRequest,
        Permission::WitnessPointNotify,
        Permission::LotView,
        Permission::LotEdit,
        Permission::LotCreate,
        Permission::DocumentView,
        Permission::DocumentUpload,
        Permission::NcrView,
        Permission::NcrCreate,
        Permission::NcrResolve,
        Permission::ApprovalView,
        Permission::ApprovalDecide,
        Permission::PlanView,
        Permission::PlanApprove,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Permission::ItpView => "itp:view",
            Permission::ItpApprove => "itp:approve",
            Permission::ItpEdit => "itp:edit",
            Permission::InspectionCheckSubcontractor => "inspection:check:subcontractor",
            Permission::InspectionCheckEngineer => "inspection:check:engineer",
            Permission::InspectionApproveQa => "inspection:approve:qa",
            Permission::InspectionUpload => "inspection:upload",
            Permission::HoldPointRequest => "holdpoint:request",
            Permission::HoldPointRelease => "holdpoint:release",
            Permission::WitnessPointRequest => "witnesspoint:request",
            Permission::WitnessPointNotify => "witnesspoint:notify",
            Permission::LotView => "lot:view",
            Permission::LotEdit => "lot:edit",
            Permission::LotCreate => "lot:create",
            Permission::DocumentView => "document:view",
            Permission::DocumentUpload => "document:upload",
            Permission::NcrView => "ncr:view",
            Permission::NcrCreate => "ncr:create",
            Permission::NcrResolve => "ncr:resolve",
            Permission::ApprovalView => "approval:view",
            Permission::ApprovalDecide => "approval:decide",
            Permission::PlanView => "plan:view",
            Permission::PlanApprove => "plan:approve",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| CoreError::UnknownPermission(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holders(permission: Permission) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| r.has_permission(permission)).collect()
    }

    #[test]
    fn admin_holds_everything_but_sign_offs() {
        for p in Permission::ALL {
            assert_eq!(Role::Admin.has_permission(p), !Permission::SIGN_OFFS.contains(&p), "{p}");
        }
    }

    #[test]
    fn sign_off_holders() {
        assert_eq!(
            holders(Permission::HoldPointRelease),
            vec![Role::Client, Role::QaManager, Role::Superintendent]
        );
        assert_eq!(
            holders(Permission::InspectionApproveQa),
            vec![Role::QaManager, Role::Superintendent]
        );
        assert_eq!(holders(Permission::InspectionCheckSubcontractor), vec![Role::Subcontractor]);
        assert_eq!(holders(Permission::InspectionCheckEngineer), vec![Role::SiteEngineer]);
    }

    #[test]
    fn subcontractor_cannot_approve() {
        assert!(Role::Subcontractor.has_permission(Permission::InspectionCheckSubcontractor));
        assert!(!Role::Subcontractor.has_permission(Permission::InspectionApproveQa));
        assert!(!Role::Subcontractor.has_permission(Permission::PlanApprove));
    }

    #[test]
    fn any_role_grants() {
        assert!(has_permission(&[Role::Subcontractor, Role::Client], Permission::PlanApprove));
        assert!(!has_permission(&[Role::Subcontractor], Permission::PlanApprove));
        assert!(!has_permission(&[], Permission::ItpView));
    }

    #[test]
    fn role_parse_accepts_labels() {
        assert_eq!("site_engineer".parse::<Role>().unwrap(), Role::SiteEngineer);
        assert_eq!("QA-Manager".parse::<Role>().unwrap(), Role::QaManager);
        assert_eq!("site engineer".parse::<Role>().unwrap(), Role::SiteEngineer);
        assert!("foreman".parse::<Role>().is_err());
        assert_eq!(Role::QaManager.label(), "qa manager");
    }

    #[test]
    fn permission_codes_roundtrip() {
        for p in Permission::ALL {
            assert_eq!(p.code().parse::<Permission>().unwrap(), p);
        }
        assert!("itp:delete".parse::<Permission>().is_err());
    }

    #[test]
    fn portal_routing() {
        assert_eq!(Role::Client.portal(), Portal::Client);
        assert_eq!(Role::Subcontractor.portal(), Portal::Subcontractor);
        assert_eq!(Role::QaManager.portal(), Portal::Main);
    }
}
