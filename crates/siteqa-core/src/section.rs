//! Plan section editing.
//!
//! A plan document is a tree of [`PlanSection`]s. [`SectionEditor`] applies
//! edits to the tree immediately and records each one as a pending
//! [`SectionPatch`] keyed by section id. The pending list is what goes over
//! the wire on save; the tree is only the local view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::asset::RawAsset;

/// One heading and its body in a plan document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSection {
    pub id: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default, alias = "heading_number")]
    pub heading_number: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default, alias = "order_index")]
    pub order_index: Option<i64>,
    #[serde(default)]
    pub children: Vec<PlanSection>,
}

impl PlanSection {
    /// Children ordered by `order_index`, then heading number.
    pub fn sorted_children(&self) -> Vec<&PlanSection> {
        let mut children: Vec<&PlanSection> = self.children.iter().collect();
        children.sort_by(|a, b| {
            a.order_index
                .unwrap_or(i64::MAX)
                .cmp(&b.order_index.unwrap_or(i64::MAX))
                .then_with(|| {
                    sort_key(a.heading_number.as_deref().unwrap_or(""))
                        .cmp(&sort_key(b.heading_number.as_deref().unwrap_or("")))
                })
        });
        children
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut PlanSection> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn apply(&mut self, patch: &SectionPatch) {
        if let Some(heading) = &patch.heading {
            self.heading = heading.clone();
        }
        if let Some(n) = &patch.heading_number {
            self.heading_number = Some(n.clone());
        }
        if let Some(body) = &patch.body {
            self.body = Some(body.clone());
        }
        if let Some(summary) = &patch.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(level) = patch.level {
            self.level = Some(level);
        }
        if let Some(order) = patch.order_index {
            self.order_index = Some(order);
        }
    }
}

/// Partial update to a section. Only the fields the backend accepts on
/// `PATCH .../sections/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

impl SectionPatch {
    pub fn is_empty(&self) -> bool {
        *self == SectionPatch::default()
    }

    /// Overlay `later` onto `self`; fields set in `later` win.
    pub fn merge(&mut self, later: SectionPatch) {
        if later.heading.is_some() {
            self.heading = later.heading;
        }
        if later.heading_number.is_some() {
            self.heading_number = later.heading_number;
        }
        if later.body.is_some() {
            self.body = later.body;
        }
        if later.summary.is_some() {
            self.summary = later.summary;
        }
        if later.level.is_some() {
            self.level = later.level;
        }
        if later.order_index.is_some() {
            self.order_index = later.order_index;
        }
    }
}

/// Local editing state for one plan document.
#[derive(Debug, Clone, Default)]
pub struct SectionEditor {
    sections: Vec<PlanSection>,
    pending: Vec<(String, SectionPatch)>,
    original_title: String,
    title: String,
    version: String,
}

impl SectionEditor {
    pub fn new(title: impl Into<String>, version: impl Into<String>, sections: Vec<PlanSection>) -> Self {
        let title = title.into();
        Self {
            sections,
            pending: Vec::new(),
            original_title: title.clone(),
            title,
            version: version.into(),
        }
    }

    /// Editor over a plan document asset: title from `name`, version from
    /// `revision_code`, sections from `content.sections`.
    pub fn from_asset(asset: &RawAsset) -> Self {
        let sections = asset
            .content_value("sections")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match serde_json::from_value(item.clone()) {
                        Ok(section) => Some(section),
                        Err(e) => {
                            warn!(asset = %asset.id, error = %e, "skipping malformed section");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self::new(
            asset.name.clone().unwrap_or_default(),
            asset.revision_code.clone().unwrap_or_else(|| "A".to_string()),
            sections,
        )
    }

    pub fn sections(&self) -> &[PlanSection] {
        &self.sections
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn title_changed(&self) -> bool {
        self.title != self.original_title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Apply `patch` to section `id` and queue it for saving.
    ///
    /// Returns whether a section with that id exists in the tree. The patch
    /// is queued either way.
    pub fn update(&mut self, id: &str, patch: SectionPatch) -> bool {
        let matched = match self.sections.iter_mut().find_map(|s| s.find_mut(id)) {
            Some(section) => {
                section.apply(&patch);
                true
            }
            None => false,
        };
        if !matched {
            debug!(section_id = id, "patch queued for section not in tree");
        }
        match self.pending.iter_mut().find(|(pid, _)| pid == id) {
            Some((_, existing)) => existing.merge(patch),
            None => self.pending.push((id.to_string(), patch)),
        }
        matched
    }

    /// Queued patches in the order their sections were first edited.
    pub fn pending(&self) -> &[(String, SectionPatch)] {
        &self.pending
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty() || self.title_changed()
    }

    /// Forget queued patches and adopt the current title as saved.
    pub fn mark_saved(&mut self) {
        self.pending.clear();
        self.original_title = self.title.clone();
    }

    /// Drop queued patches for the given ids only.
    pub fn mark_sections_saved<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let saved: Vec<&str> = ids.into_iter().collect();
        self.pending.retain(|(id, _)| !saved.contains(&id.as_str()));
    }

    pub fn mark_title_saved(&mut self) {
        self.original_title = self.title.clone();
    }
}

/// Normalise a dotted heading number into a lexicographically-sortable string.
///
/// "2" → "002", "2.10.1" → "002.010.001". Non-numeric segments sort as 0.
pub fn sort_key(heading_number: &str) -> String {
    let trimmed = heading_number.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return "000".to_string();
    }
    trimmed
        .split('.')
        .map(|seg| {
            let digits: String = seg.trim().chars().take_while(char::is_ascii_digit).collect();
            format!("{:03}", digits.parse::<u32>().unwrap_or(0))
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Next letter revision: A → B, Z → AA, AZ → BA.
///
/// Empty or non-alphabetic input counts as `A`.
pub fn next_letter_revision(current: &str) -> String {
    let current = current.trim().to_ascii_uppercase();
    if current.is_empty() || !current.bytes().all(|b| b.is_ascii_uppercase()) {
        return "B".to_string();
    }

    let mut letters = current.into_bytes();
    let mut i = letters.len();
    loop {
        if i == 0 {
            letters.insert(0, b'A');
            break;
        }
        i -= 1;
        if letters[i] == b'Z' {
            letters[i] = b'A';
        } else {
            letters[i] += 1;
            break;
        }
    }
    String::from_utf8(letters).unwrap_or_else(|_| "B".to_string())
}
