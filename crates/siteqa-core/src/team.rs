//! Project team membership and coarse permission flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Project-level permission flag stored on a team membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamPermission {
    Read,
    Write,
    Approve,
    Settings,
    Admin,
    PortalClient,
    Site,
}

impl TeamPermission {
    pub const ALL: [TeamPermission; 7] = [
        TeamPermission::Read,
        TeamPermission::Write,
        TeamPermission::Approve,
        TeamPermission::Settings,
        TeamPermission::Admin,
        TeamPermission::PortalClient,
        TeamPermission::Site,
    ];

    pub fn code(self) -> &'static str {
        match self {
            TeamPermission::Read => "read",
            TeamPermission::Write => "write",
            TeamPermission::Approve => "approve",
            TeamPermission::Settings => "settings",
            TeamPermission::Admin => "admin",
            TeamPermission::PortalClient => "portal_client",
            TeamPermission::Site => "site",
        }
    }
}

impl fmt::Display for TeamPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TeamPermission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TeamPermission::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| CoreError::UnknownPermission(s.to_string()))
    }
}

/// Named permission bundles offered when editing a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Admin,
    Client,
    Contractor,
    Site,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Admin, Preset::Client, Preset::Contractor, Preset::Site];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Admin => "admin",
            Preset::Client => "client",
            Preset::Contractor => "contractor",
            Preset::Site => "site",
        }
    }

    pub fn permissions(self) -> &'static [TeamPermission] {
        use TeamPermission::*;
        match self {
            Preset::Admin => &[Read, Write, Approve, Settings, Admin],
            Preset::Client => &[Read, Approve, PortalClient],
            Preset::Contractor => &[Read, Write],
            Preset::Site => &[Read, Write, Settings, Site],
        }
    }
}

impl FromStr for Preset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or(CoreError::UnknownPreset(s))
    }
}

/// A project membership.
///
/// Flags this client does not model are kept in `extra_permissions` and
/// written back untouched, so saving never strips them on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMember", into = "WireMember")]
pub struct TeamMember {
    pub id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub permissions: Vec<TeamPermission>,
    pub extra_permissions: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct WireMember {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    permissions: Option<Vec<Value>>,
}

impl From<WireMember> for TeamMember {
    fn from(wire: WireMember) -> Self {
        let mut permissions = Vec::new();
        let mut extra_permissions = Vec::new();
        for value in wire.permissions.unwrap_or_default() {
            match value {
                Value::String(code) => match code.parse::<TeamPermission>() {
                    Ok(p) => permissions.push(p),
                    Err(_) => {
                        debug!(member = %wire.id, permission = %code, "keeping unrecognised team permission");
                        extra_permissions.push(code);
                    }
                },
                other => warn!(member = %wire.id, value = %other, "ignoring non-string team permission"),
            }
        }
        Self {
            id: wire.id,
            user_id: wire.user_id,
            email: wire.email,
            permissions,
            extra_permissions,
        }
    }
}

impl From<TeamMember> for WireMember {
    fn from(member: TeamMember) -> Self {
        let permissions = member.wire_permissions().into_iter().map(Value::String).collect();
        Self {
            id: member.id,
            user_id: member.user_id,
            email: member.email,
            permissions: Some(permissions),
        }
    }
}

impl TeamMember {
    pub fn has(&self, permission: TeamPermission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Flip one flag; returns whether it is now granted.
    pub fn toggle(&mut self, permission: TeamPermission) -> bool {
        if let Some(pos) = self.permissions.iter().position(|p| *p == permission) {
            self.permissions.remove(pos);
            false
        } else {
            self.permissions.push(permission);
            true
        }
    }

    pub fn grant(&mut self, permission: TeamPermission) {
        if !self.has(permission) {
            self.permissions.push(permission);
        }
    }

    pub fn revoke(&mut self, permission: TeamPermission) {
        self.permissions.retain(|p| *p != permission);
    }

    /// Known flags as codes, followed by the unrecognised ones as received.
    pub fn wire_permissions(&self) -> Vec<String> {
        self.permissions
            .iter()
            .map(|p| p.code().to_string())
            .chain(self.extra_permissions.iter().cloned())
            .collect()
    }

    /// Replace the known flags with the preset's. Unrecognised flags stay.
    pub fn apply_preset(&mut self, preset: Preset) {
        self.permissions = preset.permissions().to_vec();
    }

    /// Email, then user id, then membership id.
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(self.user_id.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Envelope of `GET /api/v1/projects/:id/team`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamList {
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

/// Lowercased, trimmed email, or `None` when blank.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    (!email.is_empty()).then_some(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn toggle_flips_membership() {
        let mut m = TeamMember {
            id: "m1".into(),
            permissions: vec![TeamPermission::Read],
            ..Default::default()
        };
        assert!(m.toggle(TeamPermission::Approve));
        assert!(m.has(TeamPermission::Approve));
        assert!(!m.toggle(TeamPermission::Read));
        assert_eq!(m.permissions, vec![TeamPermission::Approve]);
    }

    #[test]
    fn presets_replace_flags() {
        let mut m = TeamMember {
            id: "m1".into(),
            permissions: vec![TeamPermission::Admin],
            ..Default::default()
        };
        m.apply_preset("Client".parse().unwrap());
        assert_eq!(
            m.permissions,
            vec![TeamPermission::Read, TeamPermission::Approve, TeamPermission::PortalClient]
        );
        assert_eq!(
            "owner".parse::<Preset>().unwrap_err(),
            CoreError::UnknownPreset("owner".into())
        );
    }

    #[test]
    fn grant_is_idempotent() {
        let mut m = TeamMember::default();
        m.grant(TeamPermission::Site);
        m.grant(TeamPermission::Site);
        assert_eq!(m.permissions.len(), 1);
        m.revoke(TeamPermission::Site);
        assert!(m.permissions.is_empty());
    }

    #[test]
    fn member_list_keeps_unknown_flags_aside() {
        let list: TeamList = serde_json::from_value(json!({
            "members": [
                {"id": "m1", "user_id": "u1", "email": "a@b.co", "permissions": ["read", "superuser", "portal_client", 7]},
                {"id": "m2", "permissions": null}
            ]
        }))
        .unwrap();
        assert_eq!(
            list.members[0].permissions,
            vec![TeamPermission::Read, TeamPermission::PortalClient]
        );
        assert_eq!(list.members[0].extra_permissions, vec!["superuser"]);
        assert!(list.members[1].permissions.is_empty());
        assert_eq!(list.members[1].display_name(), "m2");
        assert_eq!(list.members[0].display_name(), "a@b.co");
    }

    #[test]
    fn email_normalisation() {
        assert_eq!(normalize_email("  Jo@Site.COM "), Some("jo@site.com".into()));
        assert_eq!(normalize_email("   "), None);
    }

    #[test]
    fn unknown_flags_survive_edits_and_serialization() {
        let mut m: TeamMember =
            serde_json::from_value(json!({"id": "m1", "permissions": ["read", "manage_billing"]})).unwrap();
        m.grant(TeamPermission::Site);
        assert_eq!(m.wire_permissions(), vec!["read", "site", "manage_billing"]);

        m.apply_preset(Preset::Contractor);
        assert_eq!(m.extra_permissions, vec!["manage_billing"]);

        let back = serde_json::to_value(&m).unwrap();
        assert_eq!(back["permissions"], json!(["read", "write", "manage_billing"]));
        let again: TeamMember = serde_json::from_value(back).unwrap();
        assert_eq!(again, m);
    }

    #[test]
    fn permissions_serialize_as_codes() {
        let m = TeamMember {
            id: "m".into(),
            permissions: vec![TeamPermission::PortalClient],
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&m).unwrap()["permissions"], json!(["portal_client"]));
    }
}
