//! Shared status presentation.
//!
//! Every status enum maps onto one [`StatusStyle`]: a display label and a
//! [`Tone`]. Front ends pick colours per tone, never per status value.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::itp::{HoldPoint, WitnessPoint};
use crate::plan::ClientStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Warning,
    Danger,
    Caution,
    Neutral,
    Muted,
}

impl Tone {
    /// SGR colour sequence for terminal output.
    pub fn ansi(self) -> &'static str {
        match self {
            Tone::Success => "\x1b[32m",
            Tone::Warning => "\x1b[33m",
            Tone::Danger => "\x1b[31m",
            Tone::Caution => "\x1b[35m",
            Tone::Neutral => "\x1b[0m",
            Tone::Muted => "\x1b[2m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusStyle {
    pub label: Cow<'static, str>,
    pub tone: Tone,
}

impl StatusStyle {
    pub const fn new(label: &'static str, tone: Tone) -> Self {
        Self {
            label: Cow::Borrowed(label),
            tone,
        }
    }

    /// Fallback for a status value no enum recognises.
    pub fn unknown(raw: &str) -> Self {
        Self {
            label: Cow::Owned(raw.to_string()),
            tone: Tone::Neutral,
        }
    }
}

impl fmt::Display for StatusStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

pub trait Styled {
    fn style(&self) -> StatusStyle;
}

/// Style a raw backend status string through its typed enum.
pub fn style_of<T>(raw: &str) -> StatusStyle
where
    T: Styled + FromStr,
{
    match raw.parse::<T>() {
        Ok(status) => status.style(),
        Err(_) => StatusStyle::unknown(raw),
    }
}

/// Raw `status` of a plan asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Draft,
    PendingReview,
    ApprovalRequired,
    Approved,
    Rejected,
    NotAvailable,
}

impl FromStr for PlanStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(PlanStatus::Draft),
            "pending_review" => Ok(PlanStatus::PendingReview),
            "approval_required" => Ok(PlanStatus::ApprovalRequired),
            "approved" => Ok(PlanStatus::Approved),
            "rejected" => Ok(PlanStatus::Rejected),
            "not_available" => Ok(PlanStatus::NotAvailable),
            _ => Err(()),
        }
    }
}

impl Styled for PlanStatus {
    fn style(&self) -> StatusStyle {
        match self {
            PlanStatus::Draft => StatusStyle::new("Draft", Tone::Neutral),
            PlanStatus::PendingReview => StatusStyle::new("Pending review", Tone::Warning),
            PlanStatus::ApprovalRequired => StatusStyle::new("Approval required", Tone::Warning),
            PlanStatus::Approved => StatusStyle::new("Approved", Tone::Success),
            PlanStatus::Rejected => StatusStyle::new("Rejected", Tone::Danger),
            PlanStatus::NotAvailable => StatusStyle::new("Not available", Tone::Muted),
        }
    }
}

impl Styled for ClientStatus {
    fn style(&self) -> StatusStyle {
        match self {
            ClientStatus::Approved => StatusStyle::new("Approved", Tone::Success),
            ClientStatus::ApprovalRequired => StatusStyle::new("Approval required", Tone::Warning),
            ClientStatus::Draft => StatusStyle::new("Draft", Tone::Neutral),
            ClientStatus::NotAvailable => StatusStyle::new("Not available", Tone::Muted),
        }
    }
}

impl Styled for HoldPoint {
    fn style(&self) -> StatusStyle {
        match self {
            HoldPoint::NotRequested => StatusStyle::new("Hold", Tone::Danger),
            HoldPoint::Requested { .. } => StatusStyle::new("Hold requested", Tone::Caution),
            HoldPoint::Released { .. } => StatusStyle::new("Released", Tone::Success),
        }
    }
}

impl Styled for WitnessPoint {
    fn style(&self) -> StatusStyle {
        match self {
            WitnessPoint::NotRequested => StatusStyle::new("Witness", Tone::Warning),
            WitnessPoint::Requested { .. } => StatusStyle::new("Witness requested", Tone::Caution),
            WitnessPoint::Notified { .. } => StatusStyle::new("Notified", Tone::Success),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn plan_status_styles() {
        assert_eq!(style_of::<PlanStatus>("approved").tone, Tone::Success);
        assert_eq!(style_of::<PlanStatus>("PENDING_REVIEW").tone, Tone::Warning);
        assert_eq!(style_of::<PlanStatus>("not_available").label, "Not available");
    }

    #[test]
    fn unknown_status_keeps_raw_label() {
        let style = style_of::<PlanStatus>("archived");
        assert_eq!(style.label, "archived");
        assert_eq!(style.tone, Tone::Neutral);
        assert_eq!(style.to_string(), "archived");
    }

    #[test]
    fn hold_point_tones_follow_progression() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(HoldPoint::NotRequested.style().tone, Tone::Danger);
        assert_eq!(HoldPoint::Requested { on: d }.style().tone, Tone::Caution);
        assert_eq!(
            HoldPoint::Released {
                requested_on: d,
                released_on: d
            }
            .style()
            .tone,
            Tone::Success
        );
    }

    #[test]
    fn client_status_labels() {
        assert_eq!(ClientStatus::ApprovalRequired.style().label, "Approval required");
        assert_eq!(ClientStatus::NotAvailable.style().tone, Tone::Muted);
    }
}
