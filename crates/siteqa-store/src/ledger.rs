//! File-backed approval ledger.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use siteqa_core::itp::{ApprovalTracker, Transition};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::session::ApprovalSink;
use crate::StoreError;

/// Approval state for every ITP the user has touched, one JSON file per
/// (project, template) under a root directory.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a crash never leaves a half-written ledger.
#[derive(Debug, Clone)]
pub struct ApprovalLedger {
    root: PathBuf,
}

impl ApprovalLedger {
    /// Open the ledger rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened approval ledger");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the state for `(project, template)` lives.
    pub fn path_for(&self, project: &str, template: &str) -> PathBuf {
        self.root
            .join(sanitize(project))
            .join(format!("{}.json", sanitize(template)))
    }

    /// Stored state, or an empty tracker when nothing was saved yet.
    pub fn load(&self, project: &str, template: &str) -> Result<ApprovalTracker, StoreError> {
        let path = self.path_for(project, template);
        if !path.exists() {
            return Ok(ApprovalTracker::new());
        }
        let bytes = fs::read(&path)?;
        let tracker = serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        Ok(tracker)
    }

    pub fn save(&self, project: &str, template: &str, tracker: &ApprovalTracker) -> Result<(), StoreError> {
        let path = self.path_for(project, template);
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, tracker)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;

        info!(path = %path.display(), points = tracker.len(), "saved approval ledger");
        Ok(())
    }

    /// A sink that persists each confirmed tracker for one ITP.
    pub fn sink(&self, project: &str, template: &str) -> LedgerSink {
        LedgerSink {
            ledger: self.clone(),
            project: project.to_string(),
            template: template.to_string(),
        }
    }
}

/// Persists the tracker after every confirmed transition.
#[derive(Debug, Clone)]
pub struct LedgerSink {
    ledger: ApprovalLedger,
    project: String,
    template: String,
}

#[async_trait]
impl ApprovalSink for LedgerSink {
    /// The write runs on the blocking thread pool.
    async fn confirm(&self, transition: &Transition, next: &ApprovalTracker) -> Result<(), StoreError> {
        debug!(point_id = %transition.point_id, action = %transition.action, "persisting transition");
        let sink = self.clone();
        let next = next.clone();
        tokio::task::spawn_blocking(move || sink.ledger.save(&sink.project, &sink.template, &next)).await?
    }
}

/// Map a name onto `[A-Za-z0-9_-]`, everything else becoming `_`.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use siteqa_core::itp::ApprovalAction;
    use siteqa_core::role::Role;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn open_creates_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested").join("ledger");
        let ledger = ApprovalLedger::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(ledger.root(), root);
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let ledger = ApprovalLedger::open(tmp.path()).unwrap();
        assert!(ledger.load("p1", "itp-1").unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let ledger = ApprovalLedger::open(tmp.path()).unwrap();

        let mut tracker = ApprovalTracker::new();
        tracker
            .apply("hp-1", Role::Subcontractor, ApprovalAction::RequestHoldPoint, day())
            .unwrap();
        ledger.save("p1", "itp-1", &tracker).unwrap();

        let loaded = ledger.load("p1", "itp-1").unwrap();
        assert_eq!(loaded, tracker);
        assert!(ledger.load("p1", "itp-2").unwrap().is_empty());
    }

    #[test]
    fn names_are_sanitised() {
        let tmp = TempDir::new().unwrap();
        let ledger = ApprovalLedger::open(tmp.path()).unwrap();
        let path = ledger.path_for("../etc", "a b/c");
        assert_eq!(path, tmp.path().join("___etc").join("a_b_c.json"));
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn corrupt_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let ledger = ApprovalLedger::open(tmp.path()).unwrap();
        let path = ledger.path_for("p", "t");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(ledger.load("p", "t"), Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn sink_persists_candidate() {
        let tmp = TempDir::new().unwrap();
        let ledger = ApprovalLedger::open(tmp.path()).unwrap();
        let sink = ledger.sink("p", "t");

        let tracker = ApprovalTracker::new();
        let transition = tracker
            .propose("x", Role::Client, ApprovalAction::UploadAttachment, day())
            .unwrap();
        let mut next = tracker.clone();
        next.commit(transition.clone()).unwrap();

        sink.confirm(&transition, &next).await.unwrap();
        assert_eq!(ledger.load("p", "t").unwrap().record("x").attachment_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_sinks_write_their_own_files() {
        let tmp = TempDir::new().unwrap();
        let ledger = ApprovalLedger::open(tmp.path()).unwrap();
        let (first, second) = (ledger.sink("p", "itp-a"), ledger.sink("p", "itp-b"));

        let tracker = ApprovalTracker::new();
        let transition = tracker
            .propose("hp", Role::SiteEngineer, ApprovalAction::RequestHoldPoint, day())
            .unwrap();
        let mut next = tracker.clone();
        next.commit(transition.clone()).unwrap();

        let (a, b) = tokio::join!(first.confirm(&transition, &next), second.confirm(&transition, &next));
        a.unwrap();
        b.unwrap();
        assert_eq!(ledger.load("p", "itp-a").unwrap(), next);
        assert_eq!(ledger.load("p", "itp-b").unwrap(), next);
    }
}
