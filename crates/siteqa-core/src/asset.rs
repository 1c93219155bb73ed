//! Asset records as served by `GET /api/v1/assets`.
//!
//! Assets are the backend's generic persisted record (plans, drawings, ITP
//! templates, approval workflows). Their `content` and `metadata` payloads
//! are free-form JSON, so lookups go through the helpers below, which treat
//! empty strings and `null` the same as a missing key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subtype of the aggregate asset that embeds several plans in `content.plans`.
pub const AGGREGATE_PLAN_SUBTYPE: &str = "management_plans";

/// A plan (or any other) asset exactly as the backend returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAsset {
    pub id: String,
    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub revision_code: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub approval_state: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default)]
    pub is_current: Option<bool>,
}

impl RawAsset {
    /// Non-empty string at `content.<key>`.
    pub fn content_str(&self, key: &str) -> Option<&str> {
        non_empty_str(self.content.as_ref().and_then(|c| c.get(key)))
    }

    /// Raw value at `content.<key>`.
    pub fn content_value(&self, key: &str) -> Option<&Value> {
        self.content.as_ref().and_then(|c| c.get(key))
    }

    /// Non-empty string at `metadata.<key>`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        non_empty_str(self.metadata.as_ref().and_then(|m| m.get(key)))
    }

    /// Length of `content.<key>` when it is an array.
    pub fn content_array_len(&self, key: &str) -> Option<usize> {
        self.content_value(key)
            .and_then(Value::as_array)
            .map(Vec::len)
    }

    pub fn is_type(&self, asset_type: &str) -> bool {
        self.asset_type.as_deref() == Some(asset_type)
    }

    /// Embedded plan entries when this is an aggregate plan asset.
    pub fn aggregate_entries(&self) -> Option<&[Value]> {
        if self.subtype.as_deref() != Some(AGGREGATE_PLAN_SUBTYPE) {
            return None;
        }
        self.content_value("plans")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }
}

/// An `approval_workflow` asset linked to a target asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAsset {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub content: Option<WorkflowContent>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContent {
    #[serde(default)]
    pub target_asset_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub decision: Option<WorkflowDecision>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDecision {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub decided_at: Option<String>,
    #[serde(default)]
    pub decided_by: Option<String>,
}

impl WorkflowAsset {
    pub fn target_asset_id(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.target_asset_id.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Workflow status, preferring the one recorded in `content`.
    pub fn effective_status(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.status.as_deref())
            .filter(|s| !s.is_empty())
            .or_else(|| self.status.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn decision(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.decision.as_ref())
            .and_then(|d| d.decision.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Envelope of `GET /api/v1/assets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetList<T> {
    #[serde(default = "Vec::new")]
    pub assets: Vec<T>,
}

/// Non-empty string view of an optional JSON value.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Truthiness of a loosely-typed JSON flag (`true`, non-zero, non-empty).
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
