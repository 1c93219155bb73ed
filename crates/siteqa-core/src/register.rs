//! Project registers: certificates, materials, test methods, mix designs.
//!
//! Records are read-only views of `GET /api/v1/projects/:id/<register>`.
//! Status fields stay as raw strings on the wire; typed status enums exist
//! for styling through [`style_of`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::{style_of, StatusStyle, Styled, Tone};

// ── Records ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certificate {
    pub id: String,
    pub certificate_number: String,
    pub title: String,
    #[serde(rename = "type")]
    pub cert_type: String,
    pub issuing_authority: String,
    pub issued_to: String,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub status: String,
    pub description: String,
    pub standards_referenced: Vec<String>,
    pub equipment_serial_numbers: Vec<String>,
    pub calibration_points: Vec<String>,
    pub attachments: Vec<String>,
    pub reminder_days: i64,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub id: String,
    pub material_code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub supplier: String,
    pub batch_number: String,
    pub quantity_received: f64,
    pub quantity_remaining: f64,
    pub unit_of_measure: String,
    pub received_date: Option<String>,
    pub expiry_date: Option<String>,
    pub status: String,
    pub quality_status: String,
    pub approval_date: Option<String>,
    pub approved_by: Option<String>,
    pub certificates: Vec<String>,
    pub test_results: Vec<String>,
    pub storage_location: String,
    pub safety_data_sheet: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceCriteria {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub units: Option<String>,
    pub qualitative_criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestMethod {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: String,
    pub standard_reference: String,
    pub version: String,
    pub category: String,
    pub acceptance_criteria: AcceptanceCriteria,
    pub equipment_required: Vec<String>,
    pub procedure_steps: Vec<String>,
    pub safety_precautions: Vec<String>,
    pub calibration_requirements: String,
    pub status: String,
    pub approved_by: Option<String>,
    pub approval_date: Option<String>,
    pub review_frequency: String,
    pub next_review_date: Option<String>,
    pub attachments: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixDesign {
    pub id: String,
    pub mix_design_code: String,
    pub name: String,
    pub description: String,
    pub concrete_grade: String,
    pub slump_target: Option<f64>,
    pub max_aggregate_size: Option<f64>,
    pub water_cement_ratio: Option<f64>,
    /// kg/m³
    pub cement_content: Option<f64>,
    pub water_content: Option<f64>,
    pub fine_aggregate: Option<f64>,
    pub coarse_aggregate: Option<f64>,
    pub admixture_type: String,
    pub admixture_dosage: Option<f64>,
    pub status: String,
    pub approval_date: Option<String>,
    pub approved_by: Option<String>,
    pub created_date: Option<String>,
    pub last_modified: Option<String>,
    /// MPa
    pub target_strength: Option<f64>,
    pub air_content: Option<f64>,
    pub workability: String,
    pub exposure_class: String,
    pub durability_requirements: Vec<String>,
    pub quality_tests: Vec<String>,
    pub batch_records: Vec<String>,
    pub notes: String,
}

/// Which register a list request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Certificates,
    Materials,
    Methods,
    MixDesigns,
}

impl RegisterKind {
    /// Path segment under `/api/v1/projects/:id/`.
    pub fn path(self) -> &'static str {
        match self {
            RegisterKind::Certificates => "certificates",
            RegisterKind::Materials => "materials",
            RegisterKind::Methods => "methods",
            RegisterKind::MixDesigns => "mix-designs",
        }
    }

    /// Key of the record array in the response body.
    pub fn response_key(self) -> &'static str {
        match self {
            RegisterKind::Certificates => "certificates",
            RegisterKind::Materials => "materials",
            RegisterKind::Methods => "methods",
            RegisterKind::MixDesigns => "mixDesigns",
        }
    }
}

/// Pull the named record array out of a register response; missing or
/// malformed arrays are empty.
pub fn unwrap_records<T>(body: &Value, key: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

// ── Filtering ──

/// Fields a register row exposes to [`RegisterFilter`].
pub trait RegisterRecord {
    fn search_fields(&self) -> [&str; 3];
    /// Type or category; `None` for registers without one.
    fn kind(&self) -> Option<&str>;
    fn status(&self) -> &str;
}

impl RegisterRecord for Certificate {
    fn search_fields(&self) -> [&str; 3] {
        [&self.certificate_number, &self.title, &self.issuing_authority]
    }
    fn kind(&self) -> Option<&str> {
        Some(&self.cert_type)
    }
    fn status(&self) -> &str {
        &self.status
    }
}

impl RegisterRecord for Material {
    fn search_fields(&self) -> [&str; 3] {
        [&self.material_code, &self.name, &self.supplier]
    }
    fn kind(&self) -> Option<&str> {
        Some(&self.category)
    }
    fn status(&self) -> &str {
        &self.status
    }
}

impl RegisterRecord for TestMethod {
    fn search_fields(&self) -> [&str; 3] {
        [&self.code, &self.name, &self.standard_reference]
    }
    fn kind(&self) -> Option<&str> {
        Some(&self.category)
    }
    fn status(&self) -> &str {
        &self.status
    }
}

impl RegisterRecord for MixDesign {
    fn search_fields(&self) -> [&str; 3] {
        [&self.mix_design_code, &self.name, &self.concrete_grade]
    }
    fn kind(&self) -> Option<&str> {
        None
    }
    fn status(&self) -> &str {
        &self.status
    }
}

/// Search, type and status filter shared by every register.
///
/// `None` (or `"all"`) leaves a criterion open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFilter {
    pub search: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
}

impl RegisterFilter {
    pub fn matches<R: RegisterRecord>(&self, record: &R) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                record
                    .search_fields()
                    .iter()
                    .any(|f| f.to_lowercase().contains(&term))
            }
        };
        let kind_ok = match (open(&self.kind), record.kind()) {
            (None, _) | (_, None) => true,
            (Some(want), Some(have)) => want == have,
        };
        let status_ok = match open(&self.status) {
            None => true,
            Some(want) => want == record.status(),
        };
        search_ok && kind_ok && status_ok
    }

    pub fn apply<'a, R: RegisterRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }
}

fn open(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().filter(|c| !c.is_empty() && *c != "all")
}

// ── Dates ──

/// Parse a register date (`YYYY-MM-DD` or a full ISO-8601 timestamp).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Whole days from `today` until `date`; negative once past.
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// A date is expired from the day it falls on.
pub fn is_expired(expiry: Option<&str>, today: NaiveDate) -> bool {
    expiry
        .and_then(parse_date)
        .is_some_and(|d| days_until(d, today) <= 0)
}

/// Still valid, with at most `reminder_days` left.
pub fn is_expiring_soon(expiry: Option<&str>, reminder_days: i64, today: NaiveDate) -> bool {
    expiry.and_then(parse_date).is_some_and(|d| {
        let left = days_until(d, today);
        left > 0 && left <= reminder_days
    })
}

pub fn is_review_overdue(next_review: Option<&str>, today: NaiveDate) -> bool {
    is_expired(next_review, today)
}

/// Less than 10% of the received quantity remains.
pub fn is_low_stock(remaining: f64, received: f64) -> bool {
    received > 0.0 && remaining / received < 0.1
}

// ── Stats ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CertificateStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub expiring_soon: usize,
}

impl CertificateStats {
    pub fn from_records(certs: &[Certificate], today: NaiveDate) -> Self {
        certs.iter().fold(Self::default(), |mut acc, c| {
            let expired = is_expired(c.expiry_date.as_deref(), today);
            acc.total += 1;
            acc.valid += usize::from(c.status == "valid");
            acc.expired += usize::from(expired);
            acc.expiring_soon +=
                usize::from(!expired && is_expiring_soon(c.expiry_date.as_deref(), c.reminder_days, today));
            acc
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterialStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub expired: usize,
    pub low_stock: usize,
}

impl MaterialStats {
    pub fn from_records(materials: &[Material], today: NaiveDate) -> Self {
        materials.iter().fold(Self::default(), |mut acc, m| {
            acc.total += 1;
            acc.approved += usize::from(m.status == "approved");
            acc.pending += usize::from(m.status == "pending_approval");
            acc.expired += usize::from(is_expired(m.expiry_date.as_deref(), today));
            acc.low_stock += usize::from(is_low_stock(m.quantity_remaining, m.quantity_received));
            acc
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MethodStats {
    pub total: usize,
    pub approved: usize,
    pub review_overdue: usize,
}

impl MethodStats {
    pub fn from_records(methods: &[TestMethod], today: NaiveDate) -> Self {
        Self {
            total: methods.len(),
            approved: methods.iter().filter(|m| m.status == "approved").count(),
            review_overdue: methods
                .iter()
                .filter(|m| is_review_overdue(m.next_review_date.as_deref(), today))
                .count(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MixDesignStats {
    pub total: usize,
    pub approved: usize,
    pub draft: usize,
    pub tested: usize,
}

impl MixDesignStats {
    pub fn from_records(designs: &[MixDesign]) -> Self {
        Self {
            total: designs.len(),
            approved: designs.iter().filter(|d| d.status == "approved").count(),
            draft: designs.iter().filter(|d| d.status == "draft").count(),
            tested: designs.iter().filter(|d| !d.quality_tests.is_empty()).count(),
        }
    }
}

// ── Status enums ──

macro_rules! status_enum {
    ($name:ident { $($variant:ident => $code:literal, $label:literal, $tone:ident;)+ }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl Styled for $name {
            fn style(&self) -> StatusStyle {
                match self {
                    $($name::$variant => StatusStyle::new($label, Tone::$tone),)+
                }
            }
        }
    };
}

status_enum!(CertificateStatus {
    Valid => "valid", "Valid", Success;
    Expired => "expired", "Expired", Danger;
    Revoked => "revoked", "Revoked", Danger;
    Pending => "pending", "Pending", Warning;
});

status_enum!(CertificateType {
    Calibration => "calibration", "Calibration", Muted;
    Msds => "msds", "MSDS", Success;
    Accreditation => "accreditation", "Accreditation", Neutral;
    Training => "training", "Training", Caution;
    Equipment => "equipment", "Equipment", Danger;
    Other => "other", "Other", Neutral;
});

status_enum!(MaterialStatus {
    Approved => "approved", "Approved", Success;
    PendingApproval => "pending_approval", "Pending approval", Warning;
    Rejected => "rejected", "Rejected", Danger;
    Expired => "expired", "Expired", Danger;
    Depleted => "depleted", "Depleted", Caution;
});

status_enum!(QualityStatus {
    Passed => "passed", "Passed", Success;
    Failed => "failed", "Failed", Danger;
    Pending => "pending", "Pending", Warning;
    NotTested => "not_tested", "Not tested", Neutral;
});

status_enum!(MethodStatus {
    Draft => "draft", "Draft", Warning;
    Approved => "approved", "Approved", Success;
    Superseded => "superseded", "Superseded", Neutral;
});

status_enum!(MixDesignStatus {
    Draft => "draft", "Draft", Warning;
    Approved => "approved", "Approved", Success;
    Superseded => "superseded", "Superseded", Neutral;
    Rejected => "rejected", "Rejected", Danger;
});

status_enum!(Workability {
    VeryLow => "Very Low", "Very low", Danger;
    Low => "Low", "Low", Caution;
    Medium => "Medium", "Medium", Warning;
    High => "High", "High", Success;
    VeryHigh => "Very High", "Very high", Muted;
});

impl Certificate {
    pub fn status_style(&self) -> StatusStyle {
        style_of::<CertificateStatus>(&self.status)
    }

    pub fn type_style(&self) -> StatusStyle {
        style_of::<CertificateType>(&self.cert_type)
    }
}

impl Material {
    pub fn status_style(&self) -> StatusStyle {
        style_of::<MaterialStatus>(&self.status)
    }

    pub fn quality_style(&self) -> StatusStyle {
        style_of::<QualityStatus>(&self.quality_status)
    }
}

impl TestMethod {
    pub fn status_style(&self) -> StatusStyle {
        style_of::<MethodStatus>(&self.status)
    }
}

impl MixDesign {
    pub fn status_style(&self) -> StatusStyle {
        style_of::<MixDesignStatus>(&self.status)
    }

    pub fn workability_style(&self) -> StatusStyle {
        style_of::<Workability>(&self.workability)
    }
}
