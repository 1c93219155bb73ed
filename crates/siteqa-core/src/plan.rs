//! Management plan normalization.
//!
//! Plan data reaches the client in three shapes: a single asset per plan
//! type, an aggregate `management_plans` asset embedding several plans in
//! `content.plans[]`, or nothing at all. [`transform_assets_to_plans`]
//! reconciles them into exactly one [`ManagementPlan`] per [`PlanType`],
//! then links any approval workflow targeting the winning asset.
//!
//! # Replacement rule
//!
//! Candidates compete per plan type by [`PlanSource`] priority
//! (`asset` > `aggregate` > `placeholder`). On a priority tie the candidate
//! wins when its `generated_at` is greater than or equal to the holder's, so
//! the later-evaluated record wins among equals. Missing or unparseable
//! dates compare as epoch 0.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::asset::{non_empty_str, truthy, RawAsset, WorkflowAsset};
use crate::error::CoreError;

/// The four management plans every project carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Project Quality Plan.
    Pqp,
    /// Environmental Management Plan.
    Emp,
    /// Occupational Health & Safety Management Plan.
    Ohsmp,
    /// Traffic Management Plan.
    Tmp,
}

impl PlanType {
    pub const ALL: [PlanType; 4] = [PlanType::Pqp, PlanType::Emp, PlanType::Ohsmp, PlanType::Tmp];

    pub fn code(self) -> &'static str {
        match self {
            PlanType::Pqp => "pqp",
            PlanType::Emp => "emp",
            PlanType::Ohsmp => "ohsmp",
            PlanType::Tmp => "tmp",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PlanType::Pqp => "Quality Management Plan",
            PlanType::Emp => "Environmental Management Plan",
            PlanType::Ohsmp => "Health & Safety Management Plan",
            PlanType::Tmp => "Traffic Management Plan",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PlanType::Pqp => "Quality assurance, controls, and inspection requirements.",
            PlanType::Emp => "Environmental obligations, controls, and monitoring.",
            PlanType::Ohsmp => "Risk controls, safe work systems, and health procedures.",
            PlanType::Tmp => "Traffic staging, temporary works, and road-user safety.",
        }
    }

    /// Case-insensitive match against the four known codes.
    pub fn parse(value: &str) -> Option<Self> {
        PlanType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(value))
    }

    /// First candidate naming a known plan type.
    pub fn first_known<'a, I>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        candidates.into_iter().flatten().find_map(PlanType::parse)
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PlanType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanType::parse(s).ok_or_else(|| CoreError::UnknownPlanType(s.to_string()))
    }
}

/// Where a plan view model came from; doubles as replacement priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Placeholder,
    Aggregate,
    Asset,
}

impl PlanSource {
    pub fn priority(self) -> u8 {
        match self {
            PlanSource::Placeholder => 0,
            PlanSource::Aggregate => 1,
            PlanSource::Asset => 2,
        }
    }
}

/// Status shown to clients, derived from the raw asset status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Approved,
    ApprovalRequired,
    Draft,
    NotAvailable,
}

/// Raw status value a plan carries when no asset backs it.
pub const NOT_AVAILABLE: &str = "not_available";
const DEFAULT_STATUS: &str = "draft";

/// Map a raw asset status plus the approval flag onto a [`ClientStatus`].
pub fn derive_client_status(asset_status: &str, approval_required: bool) -> ClientStatus {
    let status = asset_status.to_ascii_lowercase();
    if status == "approved" {
        return ClientStatus::Approved;
    }
    if approval_required || status == "pending_review" || status == "approval_required" {
        return ClientStatus::ApprovalRequired;
    }
    if status == NOT_AVAILABLE {
        return ClientStatus::NotAvailable;
    }
    ClientStatus::Draft
}

/// Canonical per-type plan view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementPlan {
    pub id: String,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub title: String,
    pub description: String,
    pub status: String,
    pub generated_at: Option<String>,
    pub document_url: Option<String>,
    pub approval_required: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub asset_id: Option<String>,
    pub revision: Option<String>,
    pub section_count: Option<usize>,
    pub has_content: bool,
    pub source: PlanSource,
    pub client_status: ClientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_decision: Option<String>,
}

impl ManagementPlan {
    /// Stand-in for a plan type with no backing record.
    pub fn placeholder(plan_type: PlanType) -> Self {
        Self {
            id: format!("placeholder-{plan_type}"),
            plan_type,
            title: plan_type.title().to_string(),
            description: plan_type.description().to_string(),
            status: NOT_AVAILABLE.to_string(),
            generated_at: None,
            document_url: None,
            approval_required: false,
            approved_by: None,
            approved_at: None,
            asset_id: None,
            revision: None,
            section_count: None,
            has_content: false,
            source: PlanSource::Placeholder,
            client_status: ClientStatus::NotAvailable,
            workflow_id: None,
            workflow_status: None,
            workflow_decision: None,
        }
    }

    /// Build a candidate from a single per-type plan asset.
    pub fn from_asset(plan_type: PlanType, asset: &RawAsset) -> Self {
        let generated_at = first_non_empty([asset.updated_at.as_deref(), asset.created_at.as_deref()]);
        let document_url = first_non_empty([
            asset.content_str("document_url"),
            asset.content_str("blob_url"),
            asset.content_str("docx_url"),
            asset.content_str("plan_url"),
        ]);
        let section_count = asset
            .content_array_len("items")
            .or_else(|| asset.content_array_len("sections"));
        let nested_revision = asset
            .content_value("metadata")
            .and_then(|m| non_empty_str(m.get("revision")));
        let revision = first_non_empty([
            asset.revision_code.as_deref(),
            asset.content_str("revision"),
            asset.content_str("revisionIdentifier"),
            nested_revision,
        ]);
        let has_content = asset.content_str("html").is_some()
            || asset.content_str("plan_html").is_some()
            || asset.content_array_len("sections").is_some_and(|n| n > 0)
            || asset.content_array_len("items").is_some_and(|n| n > 0);
        let approval_required = truthy(asset.content_value("approval_required"))
            || asset.approval_state.as_deref() == Some("pending_review");
        let status = first_non_empty([asset.status.as_deref()]).unwrap_or_else(|| DEFAULT_STATUS.to_string());

        Self {
            id: asset.id.clone(),
            plan_type,
            title: first_non_empty([asset.name.as_deref()])
                .unwrap_or_else(|| plan_type.title().to_string()),
            description: asset
                .content_str("description")
                .unwrap_or(plan_type.description())
                .to_string(),
            client_status: derive_client_status(&status, approval_required),
            status,
            generated_at,
            document_url,
            approval_required,
            approved_by: first_non_empty([
                asset.content_str("approved_by"),
                asset.approved_by.as_deref(),
                asset.metadata_str("approved_by"),
            ]),
            approved_at: first_non_empty([
                asset.content_str("approved_at"),
                asset.approved_at.as_deref(),
                asset.metadata_str("approved_at"),
            ]),
            asset_id: Some(asset.id.clone()),
            revision,
            section_count,
            has_content,
            source: PlanSource::Asset,
            workflow_id: None,
            workflow_status: None,
            workflow_decision: None,
        }
    }

    /// Build a candidate from one entry of an aggregate asset's `content.plans[]`.
    pub fn from_aggregate_entry(plan_type: PlanType, asset: &RawAsset, entry: &Value) -> Self {
        let field = |key: &str| non_empty_str(entry.get(key));
        let generated_at = first_non_empty([
            field("generated_at"),
            asset.updated_at.as_deref(),
            asset.created_at.as_deref(),
        ]);
        let section_count = entry
            .get("plan_items")
            .and_then(Value::as_array)
            .map(Vec::len);
        let has_content = field("plan_html").is_some() || field("html").is_some();
        let approval_required = match entry.get("approval_required") {
            Some(v) if !v.is_null() => truthy(Some(v)),
            _ => truthy(asset.content_value("approval_required")),
        };
        let status = first_non_empty([asset.status.as_deref()]).unwrap_or_else(|| DEFAULT_STATUS.to_string());

        Self {
            id: format!("{}:{plan_type}", asset.id),
            plan_type,
            title: field("plan_name")
                .unwrap_or(plan_type.title())
                .to_string(),
            description: plan_type.description().to_string(),
            client_status: derive_client_status(&status, approval_required),
            status,
            generated_at,
            document_url: first_non_empty([
                field("document_url"),
                field("plan_url"),
                asset.content_str("document_url"),
            ]),
            approval_required,
            approved_by: first_non_empty([field("approved_by"), asset.content_str("approved_by")]),
            approved_at: first_non_empty([field("approved_at"), asset.content_str("approved_at")]),
            asset_id: None,
            revision: first_non_empty([field("revision"), field("plan_revision")]),
            section_count,
            has_content,
            source: PlanSource::Aggregate,
            workflow_id: None,
            workflow_status: None,
            workflow_decision: None,
        }
    }

    /// Milliseconds since the epoch of `generated_at`, 0 when absent or unparseable.
    pub fn generated_timestamp(&self) -> i64 {
        to_timestamp(self.generated_at.as_deref())
    }

    fn link_workflow(&mut self, workflow: &WorkflowAsset) {
        self.workflow_id = Some(workflow.id.clone());
        self.workflow_status = workflow.effective_status().map(str::to_string);
        self.workflow_decision = workflow.decision().map(str::to_string);
    }
}

/// Whether `candidate` should displace `current` for the same plan type.
pub fn should_replace(current: &ManagementPlan, candidate: &ManagementPlan) -> bool {
    let current_priority = current.source.priority();
    let next_priority = candidate.source.priority();
    if next_priority != current_priority {
        return next_priority > current_priority;
    }
    candidate.generated_timestamp() >= current.generated_timestamp()
}

/// Parse a backend date into epoch milliseconds; 0 when missing or invalid.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC), the
/// Postgres `YYYY-MM-DD HH:MM:SS[.f]` form, and bare dates.
pub fn to_timestamp(value: Option<&str>) -> i64 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.timestamp_millis();
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return dt.timestamp_millis();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return dt.and_utc().timestamp_millis();
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Index workflow assets by the asset they target. Later entries win.
pub fn index_workflows(workflows: &[WorkflowAsset]) -> HashMap<String, WorkflowAsset> {
    let mut by_target = HashMap::new();
    for workflow in workflows {
        if let Some(target) = workflow.target_asset_id() {
            by_target.insert(target.to_string(), workflow.clone());
        }
    }
    by_target
}

/// Reconcile raw plan assets into one plan per [`PlanType`], in [`PlanType::ALL`] order.
pub fn transform_assets_to_plans(
    assets: &[RawAsset],
    workflows_by_asset_id: Option<&HashMap<String, WorkflowAsset>>,
) -> Vec<ManagementPlan> {
    let mut plans: HashMap<PlanType, ManagementPlan> = PlanType::ALL
        .into_iter()
        .map(|t| (t, ManagementPlan::placeholder(t)))
        .collect();

    let mut offer = |candidate: ManagementPlan| {
        let slot = plans
            .entry(candidate.plan_type)
            .or_insert_with(|| ManagementPlan::placeholder(candidate.plan_type));
        if should_replace(slot, &candidate) {
            debug!(
                plan_type = %candidate.plan_type,
                id = %candidate.id,
                source = ?candidate.source,
                "plan candidate accepted"
            );
            *slot = candidate;
        }
    };

    for asset in assets.iter().filter(|a| a.is_type("plan")) {
        if let Some(entries) = asset.aggregate_entries() {
            for entry in entries {
                let Some(plan_type) = PlanType::first_known([non_empty_str(entry.get("plan_type"))])
                else {
                    debug!(asset = %asset.id, "dropping aggregate entry with unknown plan type");
                    continue;
                };
                offer(ManagementPlan::from_aggregate_entry(plan_type, asset, entry));
            }
            continue;
        }

        let nested_type = asset
            .content_value("plan_type")
            .and_then(Value::as_str);
        let Some(plan_type) = PlanType::first_known([
            asset.subtype.as_deref(),
            asset.metadata_str("plan_type"),
            nested_type,
        ]) else {
            debug!(asset = %asset.id, subtype = ?asset.subtype, "dropping asset with unknown plan type");
            continue;
        };
        offer(ManagementPlan::from_asset(plan_type, asset));
    }

    PlanType::ALL
        .into_iter()
        .map(|t| {
            let mut plan = plans
                .remove(&t)
                .unwrap_or_else(|| ManagementPlan::placeholder(t));
            if let (Some(workflows), Some(asset_id)) = (workflows_by_asset_id, plan.asset_id.clone())
                && let Some(workflow) = workflows.get(&asset_id)
            {
                plan.link_workflow(workflow);
            }
            plan
        })
        .collect()
}

/// Headline counts over a normalized plan set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total: usize,
    pub approved: usize,
    pub needs_attention: usize,
}

impl PlanSummary {
    pub fn from_plans(plans: &[ManagementPlan]) -> Self {
        let published = plans
            .iter()
            .filter(|p| p.source != PlanSource::Placeholder && p.client_status != ClientStatus::NotAvailable);
        let mut summary = PlanSummary {
            total: plans.len(),
            ..Default::default()
        };
        for plan in published {
            match plan.client_status {
                ClientStatus::Approved => summary.approved += 1,
                ClientStatus::ApprovalRequired => summary.needs_attention += 1,
                _ => {}
            }
        }
        summary
    }

    /// Nothing approved and nothing awaiting a decision.
    pub fn nothing_published(&self) -> bool {
        self.approved == 0 && self.needs_attention == 0
    }
}

fn first_non_empty<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_asset(id: &str, subtype: &str, updated_at: Option<&str>) -> RawAsset {
        RawAsset {
            id: id.into(),
            asset_type: Some("plan".into()),
            subtype: Some(subtype.into()),
            name: Some(format!("{subtype} asset {id}")),
            updated_at: updated_at.map(Into::into),
            ..Default::default()
        }
    }

    fn aggregate(id: &str, plans: Value) -> RawAsset {
        RawAsset {
            id: id.into(),
            asset_type: Some("plan".into()),
            subtype: Some("management_plans".into()),
            content: Some(json!({ "plans": plans })),
            ..Default::default()
        }
    }

    fn plan_for(plans: &[ManagementPlan], t: PlanType) -> &ManagementPlan {
        plans.iter().find(|p| p.plan_type == t).unwrap()
    }

    #[test]
    fn empty_input_yields_four_placeholders() {
        let plans = transform_assets_to_plans(&[], None);
        assert_eq!(plans.len(), 4);
        for (plan, t) in plans.iter().zip(PlanType::ALL) {
            assert_eq!(plan.plan_type, t);
            assert_eq!(plan.source, PlanSource::Placeholder);
            assert_eq!(plan.client_status, ClientStatus::NotAvailable);
            assert_eq!(plan.id, format!("placeholder-{t}"));
        }
    }

    #[test]
    fn derive_client_status_table() {
        assert_eq!(derive_client_status("approved", false), ClientStatus::Approved);
        assert_eq!(derive_client_status("APPROVED", true), ClientStatus::Approved);
        assert_eq!(derive_client_status("draft", true), ClientStatus::ApprovalRequired);
        assert_eq!(derive_client_status("pending_review", false), ClientStatus::ApprovalRequired);
        assert_eq!(derive_client_status("approval_required", false), ClientStatus::ApprovalRequired);
        assert_eq!(derive_client_status("not_available", false), ClientStatus::NotAvailable);
        assert_eq!(derive_client_status("draft", false), ClientStatus::Draft);
        assert_eq!(derive_client_status("", false), ClientStatus::Draft);
    }

    #[test]
    fn plan_type_parse_is_case_insensitive() {
        assert_eq!(PlanType::parse("EMP"), Some(PlanType::Emp));
        assert_eq!(PlanType::parse("Ohsmp"), Some(PlanType::Ohsmp));
        assert_eq!(PlanType::parse("wbs"), None);
        assert!("bogus".parse::<PlanType>().is_err());
        assert_eq!(
            PlanType::first_known([None, Some("nope"), Some("TMP")]),
            Some(PlanType::Tmp)
        );
    }

    #[test]
    fn asset_beats_aggregate_regardless_of_dates() {
        let agg = aggregate(
            "agg",
            json!([{"plan_type": "pqp", "generated_at": "2030-01-01T00:00:00Z"}]),
        );
        let single = plan_asset("single", "pqp", Some("2020-01-01T00:00:00Z"));

        for order in [vec![agg.clone(), single.clone()], vec![single, agg]] {
            let plans = transform_assets_to_plans(&order, None);
            let pqp = plan_for(&plans, PlanType::Pqp);
            assert_eq!(pqp.source, PlanSource::Asset);
            assert_eq!(pqp.id, "single");
        }
    }

    #[test]
    fn later_generated_asset_wins() {
        let older = plan_asset("old", "emp", Some("2024-01-01T00:00:00Z"));
        let newer = plan_asset("new", "emp", Some("2024-06-01T00:00:00Z"));

        let plans = transform_assets_to_plans(&[newer.clone(), older.clone()], None);
        assert_eq!(plan_for(&plans, PlanType::Emp).id, "new");

        let plans = transform_assets_to_plans(&[older, newer], None);
        assert_eq!(plan_for(&plans, PlanType::Emp).id, "new");
    }

    #[test]
    fn equal_dates_favour_later_evaluated() {
        let first = plan_asset("first", "tmp", Some("2024-03-01T00:00:00Z"));
        let second = plan_asset("second", "tmp", Some("2024-03-01T00:00:00Z"));
        let plans = transform_assets_to_plans(&[first, second], None);
        assert_eq!(plan_for(&plans, PlanType::Tmp).id, "second");
    }

    #[test]
    fn undated_candidate_never_displaces_dated_one() {
        let dated = plan_asset("dated", "pqp", Some("2024-03-01T00:00:00Z"));
        let undated = plan_asset("undated", "pqp", None);
        let plans = transform_assets_to_plans(&[dated, undated], None);
        assert_eq!(plan_for(&plans, PlanType::Pqp).id, "dated");
    }

    #[test]
    fn aggregate_entry_scenario() {
        let agg = aggregate(
            "agg-1",
            json!([{"plan_type": "emp", "generated_at": "2024-01-01", "plan_name": "EMP v1"}]),
        );
        let plans = transform_assets_to_plans(&[agg], None);

        let emp = plan_for(&plans, PlanType::Emp);
        assert_eq!(emp.title, "EMP v1");
        assert_eq!(emp.id, "agg-1:emp");
        assert_eq!(emp.status, "draft");
        assert_eq!(emp.client_status, ClientStatus::Draft);
        assert_eq!(emp.source, PlanSource::Aggregate);
        assert!(emp.asset_id.is_none());

        for t in [PlanType::Pqp, PlanType::Ohsmp, PlanType::Tmp] {
            assert_eq!(plan_for(&plans, t).source, PlanSource::Placeholder);
        }
    }

    #[test]
    fn unknown_types_and_non_plan_assets_are_dropped() {
        let mut drawing = plan_asset("d", "pqp", None);
        drawing.asset_type = Some("drawing".into());
        let wbs = plan_asset("w", "wbs", None);
        let agg = aggregate("agg", json!([{"plan_type": "xyz"}, "not-an-object", {"plan_type": null}]));

        let plans = transform_assets_to_plans(&[drawing, wbs, agg], None);
        assert!(plans.iter().all(|p| p.source == PlanSource::Placeholder));
    }

    #[test]
    fn plan_type_falls_back_to_metadata_then_content() {
        let mut from_meta = plan_asset("m", "document", None);
        from_meta.metadata = Some(json!({"plan_type": "OHSMP"}));
        let mut from_content = plan_asset("c", "document", None);
        from_content.content = Some(json!({"plan_type": "tmp"}));

        let plans = transform_assets_to_plans(&[from_meta, from_content], None);
        assert_eq!(plan_for(&plans, PlanType::Ohsmp).id, "m");
        assert_eq!(plan_for(&plans, PlanType::Tmp).id, "c");
    }

    #[test]
    fn single_asset_fields_are_extracted() {
        let asset = RawAsset {
            id: "p1".into(),
            asset_type: Some("plan".into()),
            subtype: Some("pqp".into()),
            name: None,
            status: Some("pending_review".into()),
            created_at: Some("2024-01-01T00:00:00Z".into()),
            updated_at: None,
            revision_code: None,
            content: Some(json!({
                "blob_url": "https://blob/p1.docx",
                "sections": [{"id": "s1"}, {"id": "s2"}],
                "metadata": {"revision": "C"},
                "approved_by": "qa@example.com"
            })),
            metadata: Some(json!({"approved_at": "2024-02-02"})),
            ..Default::default()
        };
        let plan = ManagementPlan::from_asset(PlanType::Pqp, &asset);
        assert_eq!(plan.title, PlanType::Pqp.title());
        assert_eq!(plan.generated_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(plan.document_url.as_deref(), Some("https://blob/p1.docx"));
        assert_eq!(plan.section_count, Some(2));
        assert_eq!(plan.revision.as_deref(), Some("C"));
        assert!(plan.has_content);
        assert_eq!(plan.approved_by.as_deref(), Some("qa@example.com"));
        assert_eq!(plan.approved_at.as_deref(), Some("2024-02-02"));
        assert_eq!(plan.client_status, ClientStatus::ApprovalRequired);
        assert_eq!(plan.asset_id.as_deref(), Some("p1"));
    }

    #[test]
    fn approval_state_marks_approval_required() {
        let mut asset = plan_asset("p", "emp", None);
        asset.status = Some("draft".into());
        asset.approval_state = Some("pending_review".into());
        let plan = ManagementPlan::from_asset(PlanType::Emp, &asset);
        assert!(plan.approval_required);
        assert_eq!(plan.client_status, ClientStatus::ApprovalRequired);
    }

    #[test]
    fn aggregate_entry_flag_overrides_content_flag() {
        let mut agg = aggregate(
            "agg",
            json!([
                {"plan_type": "pqp", "approval_required": false},
                {"plan_type": "emp"}
            ]),
        );
        if let Some(Value::Object(content)) = agg.content.as_mut() {
            content.insert("approval_required".into(), json!(true));
        }
        let plans = transform_assets_to_plans(&[agg], None);
        assert!(!plan_for(&plans, PlanType::Pqp).approval_required);
        assert!(plan_for(&plans, PlanType::Emp).approval_required);
        assert_eq!(
            plan_for(&plans, PlanType::Emp).client_status,
            ClientStatus::ApprovalRequired
        );
    }

    #[test]
    fn workflows_attach_by_asset_id() {
        let asset = plan_asset("plan-9", "pqp", None);
        let workflows = vec![
            WorkflowAsset {
                id: "wf-old".into(),
                status: Some("open".into()),
                content: Some(crate::asset::WorkflowContent {
                    target_asset_id: Some("plan-9".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            serde_json::from_value(json!({
                "id": "wf-new",
                "content": {
                    "target_asset_id": "plan-9",
                    "status": "completed",
                    "decision": {"decision": "approve"}
                }
            }))
            .unwrap(),
        ];
        let index = index_workflows(&workflows);
        let plans = transform_assets_to_plans(&[asset], Some(&index));
        let pqp = plan_for(&plans, PlanType::Pqp);
        assert_eq!(pqp.workflow_id.as_deref(), Some("wf-new"));
        assert_eq!(pqp.workflow_status.as_deref(), Some("completed"));
        assert_eq!(pqp.workflow_decision.as_deref(), Some("approve"));

        // Placeholders never carry workflows.
        assert!(plan_for(&plans, PlanType::Emp).workflow_id.is_none());
    }

    #[test]
    fn timestamps_parse_common_backend_formats() {
        assert_eq!(to_timestamp(None), 0);
        assert_eq!(to_timestamp(Some("")), 0);
        assert_eq!(to_timestamp(Some("not a date")), 0);
        let day = to_timestamp(Some("2024-01-01"));
        assert_eq!(day, 1_704_067_200_000);
        assert_eq!(to_timestamp(Some("2024-01-01T00:00:00Z")), day);
        assert_eq!(to_timestamp(Some("2024-01-01T00:00:00")), day);
        assert_eq!(to_timestamp(Some("2024-01-01 00:00:00.000")), day);
        assert_eq!(to_timestamp(Some("2024-01-01T10:00:00+10:00")), day);
    }

    #[test]
    fn summary_counts_published_plans_only() {
        let mut approved = plan_asset("a", "pqp", None);
        approved.status = Some("approved".into());
        let mut pending = plan_asset("b", "emp", None);
        pending.status = Some("pending_review".into());
        let draft = plan_asset("c", "tmp", None);

        let plans = transform_assets_to_plans(&[approved, pending, draft], None);
        let summary = PlanSummary::from_plans(&plans);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.needs_attention, 1);
        assert!(!summary.nothing_published());

        let empty = PlanSummary::from_plans(&transform_assets_to_plans(&[], None));
        assert!(empty.nothing_published());
    }

    #[test]
    fn plan_serializes_with_camel_case_keys() {
        let plan = ManagementPlan::placeholder(PlanType::Emp);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["type"], "emp");
        assert_eq!(json["clientStatus"], "not_available");
        assert_eq!(json["source"], "placeholder");
        assert!(json.get("workflowId").is_none());
    }
}
