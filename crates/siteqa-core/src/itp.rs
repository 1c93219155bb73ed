//! ITP execution: per-point approval records and the role-gated actions that
//! advance them.
//!
//! Every inspection point carries one [`InspectionPointApproval`]. Checks and
//! approvals are dated flags; hold and witness points are three-state
//! progressions that can only reach their final state through `Requested`:
//!
//! ```text
//! NotRequested --request--> Requested --release/notify--> Released/Notified
//!      ^                        |
//!      +--------cancel----------+
//! ```
//!
//! [`ApprovalTracker::propose`] computes a [`Transition`] without touching
//! state; [`ApprovalTracker::commit`] installs it. Callers that confirm each
//! action with a backend commit only after the backend accepts it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::asset::RawAsset;
use crate::error::CoreError;
use crate::role::{Permission, Role};

/// Which sign-off column a check lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckSlot {
    Subcontractor,
    Engineer,
}

impl CheckSlot {
    /// The only role allowed to tick this column.
    pub fn owner(self) -> Role {
        match self {
            CheckSlot::Subcontractor => Role::Subcontractor,
            CheckSlot::Engineer => Role::SiteEngineer,
        }
    }

    /// Permission that lets a role tick this column.
    pub fn permission(self) -> Permission {
        match self {
            CheckSlot::Subcontractor => Permission::InspectionCheckSubcontractor,
            CheckSlot::Engineer => Permission::InspectionCheckEngineer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldPoint {
    #[default]
    NotRequested,
    Requested {
        on: NaiveDate,
    },
    Released {
        requested_on: NaiveDate,
        released_on: NaiveDate,
    },
}

impl HoldPoint {
    pub fn name(self) -> &'static str {
        match self {
            HoldPoint::NotRequested => "not requested",
            HoldPoint::Requested { .. } => "requested",
            HoldPoint::Released { .. } => "released",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WitnessPoint {
    #[default]
    NotRequested,
    Requested {
        on: NaiveDate,
    },
    Notified {
        requested_on: NaiveDate,
        notified_on: NaiveDate,
    },
}

impl WitnessPoint {
    pub fn name(self) -> &'static str {
        match self {
            WitnessPoint::NotRequested => "not requested",
            WitnessPoint::Requested { .. } => "requested",
            WitnessPoint::Notified { .. } => "notified",
        }
    }
}

/// Sign-off state of one inspection point.
///
/// A check or approval is present exactly when its date is, so the
/// flag/date pairing of the wire format cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FlatApproval", into = "FlatApproval")]
pub struct InspectionPointApproval {
    pub subcontractor: Option<NaiveDate>,
    pub engineer: Option<NaiveDate>,
    pub qa: Option<NaiveDate>,
    pub attachment_count: u32,
    pub hold_point: HoldPoint,
    pub witness_point: WitnessPoint,
}

impl InspectionPointApproval {
    pub fn subcontractor_checked(&self) -> bool {
        self.subcontractor.is_some()
    }

    pub fn engineer_checked(&self) -> bool {
        self.engineer.is_some()
    }

    pub fn qa_approved(&self) -> bool {
        self.qa.is_some()
    }

    pub fn hold_point_requested(&self) -> bool {
        !matches!(self.hold_point, HoldPoint::NotRequested)
    }

    pub fn hold_point_released(&self) -> bool {
        matches!(self.hold_point, HoldPoint::Released { .. })
    }

    pub fn witness_point_requested(&self) -> bool {
        !matches!(self.witness_point, WitnessPoint::NotRequested)
    }

    pub fn witness_point_notified(&self) -> bool {
        matches!(self.witness_point, WitnessPoint::Notified { .. })
    }

    fn slot(&mut self, slot: CheckSlot) -> &mut Option<NaiveDate> {
        match slot {
            CheckSlot::Subcontractor => &mut self.subcontractor,
            CheckSlot::Engineer => &mut self.engineer,
        }
    }

    /// The record after `action`, or the name of the state that forbids it.
    pub fn next(&self, action: ApprovalAction, today: NaiveDate) -> Result<Self, &'static str> {
        let mut next = self.clone();
        match action {
            ApprovalAction::Check(slot) => *next.slot(slot) = Some(today),
            ApprovalAction::Uncheck(slot) => *next.slot(slot) = None,
            ApprovalAction::Approve => next.qa = Some(today),
            ApprovalAction::Unapprove => next.qa = None,
            ApprovalAction::UploadAttachment => {
                next.attachment_count = next.attachment_count.saturating_add(1)
            }
            ApprovalAction::RequestHoldPoint => match self.hold_point {
                HoldPoint::NotRequested => next.hold_point = HoldPoint::Requested { on: today },
                other => return Err(other.name()),
            },
            ApprovalAction::CancelHoldPointRequest => match self.hold_point {
                HoldPoint::Requested { .. } => next.hold_point = HoldPoint::NotRequested,
                other => return Err(other.name()),
            },
            ApprovalAction::ReleaseHoldPoint => match self.hold_point {
                HoldPoint::Requested { on } => {
                    next.hold_point = HoldPoint::Released {
                        requested_on: on,
                        released_on: today,
                    }
                }
                other => return Err(other.name()),
            },
            ApprovalAction::RequestWitnessPoint => match self.witness_point {
                WitnessPoint::NotRequested => {
                    next.witness_point = WitnessPoint::Requested { on: today }
                }
                other => return Err(other.name()),
            },
            ApprovalAction::CancelWitnessPointRequest => match self.witness_point {
                WitnessPoint::Requested { .. } => next.witness_point = WitnessPoint::NotRequested,
                other => return Err(other.name()),
            },
            ApprovalAction::NotifyWitnessPoint => match self.witness_point {
                WitnessPoint::Requested { on } => {
                    next.witness_point = WitnessPoint::Notified {
                        requested_on: on,
                        notified_on: today,
                    }
                }
                other => return Err(other.name()),
            },
        }
        Ok(next)
    }
}

/// Wire shape: paired flags and `YYYY-MM-DD` dates, all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatApproval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subcontractor_checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subcontractor_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engineer_checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engineer_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qa_approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qa_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hold_point_requested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hold_point_requested_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hold_point_released: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hold_point_release_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    witness_point_requested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    witness_point_requested_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    witness_point_notified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    witness_point_notified_date: Option<NaiveDate>,
}

fn paired(flag: Option<bool>, date: Option<NaiveDate>, field: &str) -> Result<Option<NaiveDate>, String> {
    match (flag.unwrap_or(false), date) {
        (true, Some(d)) => Ok(Some(d)),
        (false, None) => Ok(None),
        (true, None) => Err(format!("{field} is set without a date")),
        (false, Some(_)) => Err(format!("{field} has a date but is not set")),
    }
}

impl TryFrom<FlatApproval> for InspectionPointApproval {
    type Error = String;

    fn try_from(flat: FlatApproval) -> Result<Self, Self::Error> {
        let requested = paired(flat.hold_point_requested, flat.hold_point_requested_date, "holdPointRequested")?;
        let released = paired(flat.hold_point_released, flat.hold_point_release_date, "holdPointReleased")?;
        let hold_point = match (requested, released) {
            (None, None) => HoldPoint::NotRequested,
            (Some(on), None) => HoldPoint::Requested { on },
            (Some(requested_on), Some(released_on)) => HoldPoint::Released {
                requested_on,
                released_on,
            },
            (None, Some(_)) => return Err("hold point released without a request".into()),
        };

        let requested = paired(
            flat.witness_point_requested,
            flat.witness_point_requested_date,
            "witnessPointRequested",
        )?;
        let notified = paired(
            flat.witness_point_notified,
            flat.witness_point_notified_date,
            "witnessPointNotified",
        )?;
        let witness_point = match (requested, notified) {
            (None, None) => WitnessPoint::NotRequested,
            (Some(on), None) => WitnessPoint::Requested { on },
            (Some(requested_on), Some(notified_on)) => WitnessPoint::Notified {
                requested_on,
                notified_on,
            },
            (None, Some(_)) => return Err("witness point notified without a request".into()),
        };

        Ok(Self {
            subcontractor: paired(flat.subcontractor_checked, flat.subcontractor_date, "subcontractorChecked")?,
            engineer: paired(flat.engineer_checked, flat.engineer_date, "engineerChecked")?,
            qa: paired(flat.qa_approved, flat.qa_date, "qaApproved")?,
            attachment_count: flat.attachment_count.unwrap_or(0),
            hold_point,
            witness_point,
        })
    }
}

impl From<InspectionPointApproval> for FlatApproval {
    fn from(a: InspectionPointApproval) -> Self {
        let (hold_requested, hold_released) = match a.hold_point {
            HoldPoint::NotRequested => (None, None),
            HoldPoint::Requested { on } => (Some(on), None),
            HoldPoint::Released {
                requested_on,
                released_on,
            } => (Some(requested_on), Some(released_on)),
        };
        let (witness_requested, witness_notified) = match a.witness_point {
            WitnessPoint::NotRequested => (None, None),
            WitnessPoint::Requested { on } => (Some(on), None),
            WitnessPoint::Notified {
                requested_on,
                notified_on,
            } => (Some(requested_on), Some(notified_on)),
        };
        Self {
            subcontractor_checked: Some(a.subcontractor.is_some()),
            subcontractor_date: a.subcontractor,
            engineer_checked: Some(a.engineer.is_some()),
            engineer_date: a.engineer,
            qa_approved: Some(a.qa.is_some()),
            qa_date: a.qa,
            attachment_count: Some(a.attachment_count),
            hold_point_requested: Some(hold_requested.is_some()),
            hold_point_requested_date: hold_requested,
            hold_point_released: Some(hold_released.is_some()),
            hold_point_release_date: hold_released,
            witness_point_requested: Some(witness_requested.is_some()),
            witness_point_requested_date: witness_requested,
            witness_point_notified: Some(witness_notified.is_some()),
            witness_point_notified_date: witness_notified,
        }
    }
}

/// A discrete user action on one inspection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Check(CheckSlot),
    Uncheck(CheckSlot),
    Approve,
    Unapprove,
    RequestHoldPoint,
    CancelHoldPointRequest,
    ReleaseHoldPoint,
    RequestWitnessPoint,
    CancelWitnessPointRequest,
    NotifyWitnessPoint,
    UploadAttachment,
}

impl ApprovalAction {
    pub const ALL: [ApprovalAction; 13] = [
        ApprovalAction::Check(CheckSlot::Subcontractor),
        ApprovalAction::Check(CheckSlot::Engineer),
        ApprovalAction::Uncheck(CheckSlot::Subcontractor),
        ApprovalAction::Uncheck(CheckSlot::Engineer),
        ApprovalAction::Approve,
        ApprovalAction::Unapprove,
        ApprovalAction::RequestHoldPoint,
        ApprovalAction::CancelHoldPointRequest,
        ApprovalAction::ReleaseHoldPoint,
        ApprovalAction::RequestWitnessPoint,
        ApprovalAction::CancelWitnessPointRequest,
        ApprovalAction::NotifyWitnessPoint,
        ApprovalAction::UploadAttachment,
    ];

    /// Short command name, e.g. `check-sub` or `hold-release`.
    pub fn name(self) -> &'static str {
        match self {
            ApprovalAction::Check(CheckSlot::Subcontractor) => "check-sub",
            ApprovalAction::Check(CheckSlot::Engineer) => "check-eng",
            ApprovalAction::Uncheck(CheckSlot::Subcontractor) => "uncheck-sub",
            ApprovalAction::Uncheck(CheckSlot::Engineer) => "uncheck-eng",
            ApprovalAction::Approve => "approve",
            ApprovalAction::Unapprove => "unapprove",
            ApprovalAction::RequestHoldPoint => "hold-request",
            ApprovalAction::CancelHoldPointRequest => "hold-cancel",
            ApprovalAction::ReleaseHoldPoint => "hold-release",
            ApprovalAction::RequestWitnessPoint => "witness-request",
            ApprovalAction::CancelWitnessPointRequest => "witness-cancel",
            ApprovalAction::NotifyWitnessPoint => "witness-notify",
            ApprovalAction::UploadAttachment => "attach",
        }
    }

    /// Confirmation shown once the action has taken effect.
    pub fn success_message(self) -> &'static str {
        match self {
            ApprovalAction::Check(_) => "Item marked as checked",
            ApprovalAction::Uncheck(_) => "Item unchecked",
            ApprovalAction::Approve => "Item approved",
            ApprovalAction::Unapprove => "Approval removed",
            ApprovalAction::RequestHoldPoint => "Hold point inspection requested",
            ApprovalAction::CancelHoldPointRequest => "Hold point request cancelled",
            ApprovalAction::ReleaseHoldPoint => "Hold point released",
            ApprovalAction::RequestWitnessPoint => "Witness point inspection requested",
            ApprovalAction::CancelWitnessPointRequest => "Witness point request cancelled",
            ApprovalAction::NotifyWitnessPoint => "Witness point notification sent",
            ApprovalAction::UploadAttachment => "Attachment uploaded",
        }
    }

    /// Permission the acting role must hold, if the action is gated.
    pub fn required_permission(self) -> Option<Permission> {
        match self {
            ApprovalAction::Check(slot) | ApprovalAction::Uncheck(slot) => Some(slot.permission()),
            ApprovalAction::Approve | ApprovalAction::Unapprove => Some(Permission::InspectionApproveQa),
            ApprovalAction::ReleaseHoldPoint => Some(Permission::HoldPointRelease),
            ApprovalAction::RequestHoldPoint
            | ApprovalAction::CancelHoldPointRequest
            | ApprovalAction::RequestWitnessPoint
            | ApprovalAction::CancelWitnessPointRequest
            | ApprovalAction::NotifyWitnessPoint
            | ApprovalAction::UploadAttachment => None,
        }
    }

    /// Whether `role` may perform this action.
    pub fn permits(self, role: Role) -> bool {
        self.required_permission().is_none_or(|p| role.has_permission(p))
    }

    fn needs_hold_point(self) -> bool {
        matches!(
            self,
            ApprovalAction::RequestHoldPoint
                | ApprovalAction::CancelHoldPointRequest
                | ApprovalAction::ReleaseHoldPoint
        )
    }

    fn needs_witness_point(self) -> bool {
        matches!(
            self,
            ApprovalAction::RequestWitnessPoint
                | ApprovalAction::CancelWitnessPointRequest
                | ApprovalAction::NotifyWitnessPoint
        )
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ApprovalAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApprovalAction::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| CoreError::UnknownAction(s.to_string()))
    }
}

/// A computed but not yet installed change to one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub point_id: String,
    pub role: Role,
    pub action: ApprovalAction,
    pub on: NaiveDate,
    pub before: InspectionPointApproval,
    pub after: InspectionPointApproval,
}

/// Approval records for every point of one ITP, keyed by point id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalTracker {
    points: BTreeMap<String, InspectionPointApproval>,
}

impl ApprovalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, point_id: &str) -> Option<&InspectionPointApproval> {
        self.points.get(point_id)
    }

    /// Record for `point_id`, or an empty one if the point was never touched.
    pub fn record(&self, point_id: &str) -> InspectionPointApproval {
        self.points.get(point_id).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InspectionPointApproval)> {
        self.points.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Gate `action` on `role` and compute its effect without mutating.
    pub fn propose(
        &self,
        point_id: &str,
        role: Role,
        action: ApprovalAction,
        today: NaiveDate,
    ) -> Result<Transition, CoreError> {
        if !action.permits(role) {
            warn!(point_id, %role, %action, "approval action denied");
            return Err(CoreError::PermissionDenied { role, action });
        }
        let before = self.record(point_id);
        let after = before
            .next(action, today)
            .map_err(|state| CoreError::InvalidTransition {
                point_id: point_id.to_string(),
                action,
                state,
            })?;
        Ok(Transition {
            point_id: point_id.to_string(),
            role,
            action,
            on: today,
            before,
            after,
        })
    }

    /// Install a proposed transition.
    ///
    /// Fails with [`CoreError::StaleTransition`] if the point changed since
    /// the transition was proposed.
    pub fn commit(&mut self, transition: Transition) -> Result<&'static str, CoreError> {
        if self.record(&transition.point_id) != transition.before {
            return Err(CoreError::StaleTransition(transition.point_id));
        }
        debug!(
            point_id = %transition.point_id,
            action = %transition.action,
            role = %transition.role,
            "approval transition committed"
        );
        self.points.insert(transition.point_id, transition.after);
        Ok(transition.action.success_message())
    }

    /// Propose and commit in one step; the local-only path.
    pub fn apply(
        &mut self,
        point_id: &str,
        role: Role,
        action: ApprovalAction,
        today: NaiveDate,
    ) -> Result<&'static str, CoreError> {
        let transition = self.propose(point_id, role, action, today)?;
        self.commit(transition)
    }
}

/// What a role can do on the ITP grid as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_check: bool,
    pub can_approve: bool,
    pub can_release_hold_point: bool,
    pub can_submit_for_approval: bool,
}

impl Capabilities {
    pub fn for_role(role: Role) -> Self {
        Self {
            can_check: [CheckSlot::Subcontractor, CheckSlot::Engineer]
                .into_iter()
                .any(|slot| role.has_permission(slot.permission())),
            can_approve: ApprovalAction::Approve.permits(role),
            can_release_hold_point: ApprovalAction::ReleaseHoldPoint.permits(role),
            can_submit_for_approval: role == Role::QaManager,
        }
    }
}

/// One row of an ITP template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionPoint {
    #[serde(default, deserialize_with = "row_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub item_number: Option<Value>,
    #[serde(default)]
    pub sequence: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub is_section: Option<bool>,
    #[serde(default, rename = "type")]
    pub row_type: Option<String>,
    #[serde(default)]
    pub is_hold_point: Option<bool>,
    #[serde(default)]
    pub is_witness_point: Option<bool>,
    #[serde(default)]
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub requirement: Option<String>,
    #[serde(default)]
    pub test_method: Option<String>,
    #[serde(default)]
    pub test_frequency: Option<String>,
    #[serde(default)]
    pub responsible_party: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Row ids arrive as strings or bare numbers.
fn row_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(serde::de::Error::custom(format!("invalid row id {other}"))),
    }
}

impl InspectionPoint {
    pub fn is_section(&self) -> bool {
        self.is_section.unwrap_or(false) || self.row_type.as_deref() == Some("section")
    }

    pub fn is_hold_point(&self) -> bool {
        self.is_hold_point.unwrap_or(false)
    }

    pub fn is_witness_point(&self) -> bool {
        self.is_witness_point.unwrap_or(false)
    }

    /// `itemNumber`, falling back to `sequence`.
    pub fn number_label(&self) -> String {
        let value = self
            .item_number
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.sequence.as_ref());
        match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Description, or the section title for section rows.
    pub fn label(&self) -> &str {
        self.description
            .as_deref()
            .or(self.section.as_deref())
            .unwrap_or("")
    }
}

/// An ITP template asset with its inspection rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItpTemplate {
    pub id: String,
    pub name: String,
    pub revision: String,
    pub points: Vec<InspectionPoint>,
}

impl ItpTemplate {
    /// Read the rows from `content.items`; malformed rows are skipped.
    ///
    /// Rows without an id get `point-<index>`, where `index` is the row's
    /// position in the raw `items` array. Skipping a malformed row never
    /// renumbers the rows after it.
    pub fn from_asset(asset: &RawAsset) -> Self {
        let points = asset
            .content_value("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| {
                        match serde_json::from_value::<InspectionPoint>(item.clone()) {
                            Ok(mut point) => {
                                if point.id.as_deref().is_none_or(str::is_empty) {
                                    point.id = Some(format!("point-{index}"));
                                }
                                Some(point)
                            }
                            Err(e) => {
                                warn!(template = %asset.id, index, error = %e, "skipping malformed ITP row");
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        let version = asset
            .content
            .as_ref()
            .and_then(|c| c.get("version"))
            .and_then(Value::as_str);
        let revision = asset
            .content_str("revision")
            .or(version)
            .unwrap_or("A")
            .to_string();

        Self {
            id: asset.id.clone(),
            name: asset.name.clone().unwrap_or_default(),
            revision,
            points,
        }
    }

    /// Id of the row at `index`. Parsed rows always carry one; hand-built
    /// rows without an id fall back to `point-<index>`.
    pub fn point_id(&self, index: usize) -> Option<String> {
        self.points.get(index).map(|p| match p.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("point-{index}"),
        })
    }

    /// Ids of every row, sections included.
    pub fn point_ids(&self) -> Vec<String> {
        (0..self.points.len())
            .filter_map(|i| self.point_id(i))
            .collect()
    }

    pub fn find(&self, point_id: &str) -> Option<&InspectionPoint> {
        (0..self.points.len())
            .find(|&i| self.point_id(i).as_deref() == Some(point_id))
            .map(|i| &self.points[i])
    }

    /// Reject actions that make no sense for the addressed row.
    pub fn check_action(&self, point_id: &str, action: ApprovalAction) -> Result<(), CoreError> {
        let point = self
            .find(point_id)
            .ok_or_else(|| CoreError::UnknownPoint(point_id.to_string()))?;
        if point.is_section() {
            return Err(CoreError::PointKind {
                point_id: point_id.to_string(),
                expected: "an inspection row",
            });
        }
        if action.needs_hold_point() && !point.is_hold_point() {
            return Err(CoreError::PointKind {
                point_id: point_id.to_string(),
                expected: "a hold point",
            });
        }
        if action.needs_witness_point() && !point.is_witness_point() {
            return Err(CoreError::PointKind {
                point_id: point_id.to_string(),
                expected: "a witness point",
            });
        }
        Ok(())
    }
}
