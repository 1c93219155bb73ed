//! Project settings and compliance configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Modules switched on for a new project.
pub const DEFAULT_FEATURE_FLAGS: [&str; 5] = [
    "quality_module",
    "hse_module",
    "field_operations",
    "approvals",
    "reporting",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub inspection_reminders: bool,
    pub approval_deadlines: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            inspection_reminders: true,
            approval_deadlines: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub compliance_pack: String,
    pub feature_flags: BTreeMap<String, bool>,
    pub notification_settings: NotificationSettings,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            compliance_pack: String::new(),
            feature_flags: DEFAULT_FEATURE_FLAGS
                .iter()
                .map(|f| (f.to_string(), true))
                .collect(),
            notification_settings: NotificationSettings::default(),
        }
    }
}

/// `GET /api/v1/projects/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub client_name: String,
    pub status: String,
    pub settings: ProjectSettings,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            location: String::new(),
            client_name: String::new(),
            status: "draft".to_string(),
            settings: ProjectSettings::default(),
        }
    }
}

impl Project {
    /// Body for `PATCH /api/v1/projects/:id`.
    pub fn update_body(&self) -> ProjectUpdate<'_> {
        ProjectUpdate {
            name: &self.name,
            description: &self.description,
            location: &self.location,
            client_name: &self.client_name,
            status: &self.status,
            settings: &self.settings,
        }
    }

    pub fn feature_enabled(&self, flag: &str) -> bool {
        self.settings.feature_flags.get(flag).copied().unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectUpdate<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub client_name: &'a str,
    pub status: &'a str,
    pub settings: &'a ProjectSettings,
}

/// `GET /api/v1/projects/:id/compliance/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub pack_content: Option<PackContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackContent {
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

impl ComplianceConfig {
    /// Jurisdiction from the pack content, else the top-level field.
    pub fn jurisdiction(&self) -> Option<&str> {
        self.pack_content
            .as_ref()
            .and_then(|p| p.jurisdiction.as_deref())
            .filter(|j| !j.is_empty())
            .or_else(|| self.jurisdiction.as_deref().filter(|j| !j.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_settings_fall_back_to_defaults() {
        let project: Project = serde_json::from_value(json!({"id": "p1", "name": "Bypass"})).unwrap();
        assert_eq!(project.status, "draft");
        assert!(project.feature_enabled("quality_module"));
        assert!(!project.feature_enabled("bim"));
        assert!(project.settings.notification_settings.approval_deadlines);
    }

    #[test]
    fn update_body_nests_settings_and_omits_id() {
        let mut project = Project {
            id: "p1".into(),
            name: "Bypass".into(),
            ..Default::default()
        };
        project.settings.compliance_pack = "qld-tmr".into();
        let body = serde_json::to_value(project.update_body()).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["settings"]["compliance_pack"], "qld-tmr");
        assert_eq!(body["settings"]["feature_flags"]["reporting"], true);
    }

    #[test]
    fn jurisdiction_prefers_pack_content() {
        let cfg: ComplianceConfig = serde_json::from_value(json!({
            "jurisdiction": "NSW",
            "pack_content": {"jurisdiction": "QLD"}
        }))
        .unwrap();
        assert_eq!(cfg.jurisdiction(), Some("QLD"));

        let flat: ComplianceConfig = serde_json::from_value(json!({"jurisdiction": "VIC"})).unwrap();
        assert_eq!(flat.jurisdiction(), Some("VIC"));
        assert_eq!(ComplianceConfig::default().jurisdiction(), None);
    }
}
