//! Management plans, approval workflows and project settings.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use siteqa_core::asset::{RawAsset, WorkflowAsset};
use siteqa_core::plan::{index_workflows, transform_assets_to_plans, ManagementPlan, PlanSummary, PlanType};
use siteqa_core::project::{ComplianceConfig, Project};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::SyncError;

pub const PLAN_ASSET_TYPE: &str = "plan";
pub const WORKFLOW_ASSET_TYPE: &str = "approval_workflow";

/// Everything the plan overview needs in one fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanBoard {
    pub plans: Vec<ManagementPlan>,
    pub summary: PlanSummary,
    pub jurisdiction: Option<String>,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

impl ApiClient {
    /// Fetch plan assets, workflows and compliance config concurrently and
    /// normalise them.
    ///
    /// Only the plan fetch is required; missing workflows or compliance
    /// config degrade to nothing.
    pub async fn fetch_plans(&self, project: &str) -> Result<PlanBoard, SyncError> {
        let (plans, workflows, compliance) = tokio::join!(
            self.list_assets::<RawAsset>(project, PLAN_ASSET_TYPE),
            self.list_assets::<WorkflowAsset>(project, WORKFLOW_ASSET_TYPE),
            self.compliance_config(project),
        );
        let assets = plans?;
        let workflows = workflows.unwrap_or_else(|e| {
            warn!(project, error = %e, "approval workflows unavailable");
            Vec::new()
        });
        let jurisdiction = match compliance {
            Ok(cfg) => cfg.jurisdiction().map(str::to_string),
            Err(e) => {
                warn!(project, error = %e, "compliance config unavailable");
                None
            }
        };

        let index = index_workflows(&workflows);
        let plans = transform_assets_to_plans(&assets, Some(&index));
        let summary = PlanSummary::from_plans(&plans);
        info!(
            project,
            approved = summary.approved,
            needs_attention = summary.needs_attention,
            "plans loaded"
        );
        Ok(PlanBoard {
            plans,
            summary,
            jurisdiction,
        })
    }

    /// `GET /projects/:id/compliance/config`.
    pub async fn compliance_config(&self, project: &str) -> Result<ComplianceConfig, SyncError> {
        let req = self.request(Method::GET, &["projects", project, "compliance", "config"]);
        self.send_json(req).await
    }

    /// `GET /projects/:id/plans/:type/fetch`: the current plan document asset.
    pub async fn fetch_plan_document(&self, project: &str, plan_type: PlanType) -> Result<RawAsset, SyncError> {
        let req = self.request(Method::GET, &["projects", project, "plans", plan_type.code(), "fetch"]);
        self.send_json(req).await
    }

    /// Create an approval workflow targeting `target_asset_id`; returns its id.
    pub async fn create_workflow(&self, project: &str, name: &str, target_asset_id: &str) -> Result<String, SyncError> {
        let body = json!({
            "projectId": project,
            "name": name,
            "workflowDefinition": {"steps": []},
            "targetAssetId": target_asset_id,
        });
        let req = self.request(Method::POST, &["approvals", "workflows"]).json(&body);
        let created: Created = self.send_json(req).await?;
        info!(workflow_id = %created.id, target_asset_id, "created approval workflow");
        Ok(created.id)
    }

    pub async fn decide_workflow(&self, workflow_id: &str, decision: &str, comment: Option<&str>) -> Result<(), SyncError> {
        let mut body = json!({
            "id": workflow_id,
            "action": "decide",
            "decision": decision,
        });
        if let Some(comment) = comment {
            body["comment"] = json!(comment);
        }
        let req = self.request(Method::PUT, &["approvals", "workflows"]).json(&body);
        self.send_unit(req).await?;
        info!(workflow_id, decision, "workflow decided");
        Ok(())
    }

    /// Approve a plan, creating its workflow first when it has none.
    pub async fn quick_approve(&self, project: &str, plan: &ManagementPlan) -> Result<String, SyncError> {
        let asset_id = plan
            .asset_id
            .as_deref()
            .ok_or_else(|| SyncError::MissingAsset(plan.id.clone()))?;
        let workflow_id = match plan.workflow_id.as_deref() {
            Some(id) => id.to_string(),
            None => {
                self.create_workflow(project, &format!("{} approval", plan.title), asset_id)
                    .await?
            }
        };
        self.decide_workflow(&workflow_id, "approve", None).await?;
        Ok(workflow_id)
    }

    pub async fn get_project(&self, project: &str) -> Result<Project, SyncError> {
        self.send_json(self.request(Method::GET, &["projects", project])).await
    }

    pub async fn update_project(&self, project: &Project) -> Result<(), SyncError> {
        let req = self
            .request(Method::PATCH, &["projects", project.id.as_str()])
            .json(&project.update_body());
        self.send_unit(req).await?;
        info!(project = %project.id, "project settings saved");
        Ok(())
    }
}
