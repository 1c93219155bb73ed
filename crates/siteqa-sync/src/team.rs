//! Project team membership.

use reqwest::Method;
use serde_json::json;
use siteqa_core::team::{normalize_email, TeamList, TeamMember, TeamPermission};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::SyncError;

/// Outcome of a batch of independent updates.
///
/// Every item is attempted; failures are collected, never short-circuit.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, SyncError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl ApiClient {
    fn team_path(project: &str) -> [&str; 3] {
        ["projects", project, "team"]
    }

    pub async fn list_team(&self, project: &str) -> Result<Vec<TeamMember>, SyncError> {
        let list: TeamList = self
            .send_json(self.request(Method::GET, &Self::team_path(project)))
            .await?;
        Ok(list.members)
    }

    /// Invite `email` with the given flags (read-only when empty).
    pub async fn add_member(
        &self,
        project: &str,
        email: &str,
        permissions: &[TeamPermission],
    ) -> Result<(), SyncError> {
        let email = normalize_email(email).ok_or_else(|| SyncError::InvalidInput("email is required".into()))?;
        let permissions = if permissions.is_empty() {
            &[TeamPermission::Read][..]
        } else {
            permissions
        };
        let body = json!({"email": email, "permissions": permissions});
        let req = self.request(Method::POST, &Self::team_path(project)).json(&body);
        self.send_unit(req).await?;
        info!(project, email = %email, "team member added");
        Ok(())
    }

    pub async fn remove_member(&self, project: &str, member_id: &str) -> Result<(), SyncError> {
        let req = self
            .request(Method::DELETE, &Self::team_path(project))
            .query(&[("id", member_id)]);
        self.send_unit(req).await?;
        info!(project, member_id, "team member removed");
        Ok(())
    }

    /// Replace one member's flags, unrecognised ones included.
    pub async fn update_member(&self, project: &str, member: &TeamMember) -> Result<(), SyncError> {
        let body = json!({"id": member.id, "permissions": member.wire_permissions()});
        let req = self.request(Method::PUT, &Self::team_path(project)).json(&body);
        self.send_unit(req).await?;
        Ok(())
    }

    /// Push every member's flags, one PUT each, and report per member.
    pub async fn save_team(&self, project: &str, members: &[TeamMember]) -> BatchReport {
        let mut report = BatchReport::default();
        for member in members {
            match self.update_member(project, member).await {
                Ok(()) => report.succeeded.push(member.id.clone()),
                Err(e) => {
                    warn!(project, member_id = %member.id, error = %e, "team member update failed");
                    report.failed.push((member.id.clone(), e));
                }
            }
        }
        info!(
            project,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "team saved"
        );
        report
    }
}
