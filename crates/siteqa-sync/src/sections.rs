//! Plan document sections: save queued edits and commit revisions.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use siteqa_core::plan::PlanType;
use siteqa_core::section::{SectionEditor, SectionPatch};
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::SyncError;

/// Outcome of [`ApiClient::save_sections`].
#[derive(Debug, Default)]
pub struct SectionSaveReport {
    pub title_saved: bool,
    pub saved: Vec<String>,
    pub failed: Vec<(String, SyncError)>,
    /// Queued patches with no fields to send.
    pub skipped: Vec<String>,
}

impl SectionSaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.failed.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[derive(Deserialize)]
struct Committed {
    version: Option<String>,
    revision_code: Option<String>,
}


impl ApiClient {
    pub async fn patch_section(
        &self,
        project: &str,
        plan_type: PlanType,
        section_id: &str,
        patch: &SectionPatch,
    ) -> Result<(), SyncError> {
        let req = self
            .request(Method::PATCH, &["projects", project, "plans", plan_type.code(), "sections", section_id])
            .json(patch);
        self.send_unit(req).await?;
        debug!(project, %plan_type, section_id, "section patched");
        Ok(())
    }

    pub async fn update_plan_title(&self, project: &str, plan_type: PlanType, title: &str) -> Result<(), SyncError> {
        let req = self
            .request(Method::POST, &["projects", project, "plans", plan_type.code(), "update"])
            .json(&json!({"title": title}));
        self.send_unit(req).await?;
        Ok(())
    }

    /// Cut a new revision; returns the server's new version if it sent one.
    pub async fn commit_plan(&self, project: &str, plan_type: PlanType) -> Result<Option<String>, SyncError> {
        let req = self.request(Method::POST, &["projects", project, "plans", plan_type.code(), "commit"]);
        let committed: Committed = self.send_json(req).await?;
        Ok(committed.version.or(committed.revision_code))
    }

    /// Push the title (if changed) and every queued section patch in the
    /// order the sections were first edited.
    ///
    /// Every request is attempted. Saved entries leave the queue; failed
    /// ones stay queued for the next save. The optimistic tree is never
    /// rolled back.
    pub async fn save_sections(
        &self,
        project: &str,
        plan_type: PlanType,
        editor: &mut SectionEditor,
    ) -> SectionSaveReport {
        let mut report = SectionSaveReport::default();

        if editor.title_changed() {
            match self.update_plan_title(project, plan_type, editor.title()).await {
                Ok(()) => {
                    editor.mark_title_saved();
                    report.title_saved = true;
                }
                Err(e) => {
                    warn!(project, %plan_type, error = %e, "plan title save failed");
                    report.failed.push(("title".to_string(), e));
                }
            }
        }

        for (id, patch) in editor.pending() {
            if patch.is_empty() {
                report.skipped.push(id.clone());
                continue;
            }
            match self.patch_section(project, plan_type, id, patch).await {
                Ok(()) => report.saved.push(id.clone()),
                Err(e) => {
                    warn!(project, %plan_type, section_id = %id, error = %e, "section save failed");
                    report.failed.push((id.clone(), e));
                }
            }
        }

        editor.mark_sections_saved(report.saved.iter().chain(&report.skipped).map(String::as_str));
        info!(
            project,
            %plan_type,
            saved = report.saved.len(),
            failed = report.failed.len(),
            "plan sections saved"
        );
        report
    }

    /// Save outstanding edits, then commit a new revision and adopt its
    /// version.
    ///
    /// Refuses to commit while any edit failed to save, so a revision never
    /// omits changes the user made.
    pub async fn commit_revision(
        &self,
        project: &str,
        plan_type: PlanType,
        editor: &mut SectionEditor,
    ) -> Result<String, SyncError> {
        if editor.has_changes() {
            let report = self.save_sections(project, plan_type, editor).await;
            if !report.is_complete() {
                return Err(SyncError::SaveIncomplete(report.failed_ids()));
            }
        }
        match self.commit_plan(project, plan_type).await? {
            Some(version) => {
                info!(project, %plan_type, version = %version, "plan revision committed");
                editor.set_version(version);
            }
            None => warn!(project, %plan_type, "commit response carried no version"),
        }
        Ok(editor.version().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::stub::Stub;
    use siteqa_core::section::PlanSection;

    fn editor() -> SectionEditor {
        let sections = vec![
            PlanSection {
                id: "s1".into(),
                heading: "Scope".into(),
                ..Default::default()
            },
            PlanSection {
                id: "s2".into(),
                heading: "Hold points".into(),
                ..Default::default()
            },
        ];
        SectionEditor::new("Project Quality Plan", "A", sections)
    }

    fn body(text: &str) -> SectionPatch {
        SectionPatch {
            body: Some(text.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn save_keeps_failed_patches_queued() {
        let server = Stub::new()
            .on("POST", "/api/v1/projects/p1/plans/pqp/update", 200, json!({}))
            .on("PATCH", "/api/v1/projects/p1/plans/pqp/sections/s2", 200, json!({}))
            .on("PATCH", "/api/v1/projects/p1/plans/pqp/sections/s1", 409, json!({"error": "locked"}))
            .start()
            .await;
        let api = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();
        let mut editor = editor();
        editor.set_title("PQP Rev B");
        editor.update("s2", body("Witness at pour"));
        editor.update("s1", body("Earthworks"));

        let report = api.save_sections("p1", PlanType::Pqp, &mut editor).await;
        assert!(report.title_saved);
        assert_eq!(report.saved, vec!["s2"]);
        assert_eq!(report.failed_ids(), vec!["s1"]);
        assert!(!editor.title_changed());
        assert_eq!(editor.pending().len(), 1);
        assert_eq!(editor.pending()[0].0, "s1");

        let paths: Vec<String> = server.requests().iter().map(|r| r.path().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "/api/v1/projects/p1/plans/pqp/update",
                "/api/v1/projects/p1/plans/pqp/sections/s2",
                "/api/v1/projects/p1/plans/pqp/sections/s1",
            ]
        );
        assert_eq!(server.requests()[1].json(), json!({"body": "Witness at pour"}));
    }

    #[tokio::test]
    async fn empty_patches_are_not_sent() {
        let server = Stub::new().start().await;
        let api = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();
        let mut editor = editor();
        editor.update("s1", SectionPatch::default());

        let report = api.save_sections("p1", PlanType::Pqp, &mut editor).await;
        assert_eq!(report.skipped, vec!["s1"]);
        assert!(!editor.has_changes());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn commit_saves_first_and_adopts_version() {
        let server = Stub::new()
            .on("PATCH", "/api/v1/projects/p1/plans/emp/sections/s1", 200, json!({}))
            .on("POST", "/api/v1/projects/p1/plans/emp/commit", 200, json!({"version": "B"}))
            .start()
            .await;
        let api = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();
        let mut editor = editor();
        editor.update("s1", body("Dust suppression"));

        let version = api.commit_revision("p1", PlanType::Emp, &mut editor).await.unwrap();
        assert_eq!(version, "B");
        assert_eq!(editor.version(), "B");
        assert!(!editor.has_changes());
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn commit_refuses_after_failed_save() {
        let server = Stub::new()
            .on("PATCH", "/api/v1/projects/p1/plans/emp/sections/s1", 500, json!({"error": "db"}))
            .on("POST", "/api/v1/projects/p1/plans/emp/commit", 200, json!({"version": "B"}))
            .start()
            .await;
        let api = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();
        let mut editor = editor();
        editor.update("s1", body("x"));

        let err = api.commit_revision("p1", PlanType::Emp, &mut editor).await.unwrap_err();
        assert!(matches!(err, SyncError::SaveIncomplete(ref ids) if ids == &["s1".to_string()]));
        assert_eq!(editor.version(), "A");
        assert!(server.requests_to("POST", "/api/v1/projects/p1/plans/emp/commit").is_empty());
    }

    #[tokio::test]
    async fn commit_falls_back_to_revision_code() {
        let server = Stub::new()
            .on("POST", "/api/v1/projects/p1/plans/ohsmp/commit", 200, json!({"revision_code": "C"}))
            .start()
            .await;
        let api = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();
        let mut editor = editor();
        assert_eq!(api.commit_revision("p1", PlanType::Ohsmp, &mut editor).await.unwrap(), "C");
    }
}
