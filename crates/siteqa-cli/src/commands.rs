//! Subcommand handlers.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use siteqa_core::asset::RawAsset;
use siteqa_core::register::{CertificateStats, MaterialStats, MethodStats, MixDesignStats, RegisterFilter};
use siteqa_core::section::{next_letter_revision, sort_key, PlanSection};
use siteqa_core::upload::{AttachmentLimits, UploadStatus};
use siteqa_core::{ApprovalAction, ItpTemplate, PlanType, Role, SectionEditor, SectionPatch, TeamMember, TeamPermission};
use siteqa_store::{ApprovalLedger, CommandOutcome, ItpSession};
use siteqa_sync::{ApiClient, Progress, UploadFile};
use tracing::info;

use crate::display;
use crate::{Cli, RegisterArg};

/// Asset type of ITP templates in the asset listing.
pub const ITP_TEMPLATE_ASSET_TYPE: &str = "itp_template";

pub struct Ctx {
    pub api: ApiClient,
    project: Option<String>,
    pub role: Role,
    pub ledger_dir: PathBuf,
    pub color: bool,
}

impl Ctx {
    pub fn new(api: ApiClient, cli: &Cli) -> Self {
        Self {
            api,
            project: cli.project.clone(),
            role: cli.role,
            ledger_dir: cli.ledger_dir.clone(),
            color: !cli.no_color && std::io::stdout().is_terminal(),
        }
    }

    fn project(&self) -> anyhow::Result<&str> {
        self.project
            .as_deref()
            .filter(|p| !p.is_empty())
            .context("a project is required: pass --project or set SITEQA_PROJECT")
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ── Plans ──

pub async fn plans(ctx: &Ctx) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let board = ctx.api.fetch_plans(project).await.context("failed to load plans")?;
    print!("{}", display::plan_board(&board, ctx.color));
    Ok(())
}

pub async fn approve_plan(ctx: &Ctx, plan_type: PlanType) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let board = ctx.api.fetch_plans(project).await.context("failed to load plans")?;
    let plan = board
        .plans
        .iter()
        .find(|p| p.plan_type == plan_type)
        .with_context(|| format!("no {plan_type} plan on the board"))?;
    let workflow_id = ctx
        .api
        .quick_approve(project, plan)
        .await
        .with_context(|| format!("failed to approve {plan_type}"))?;
    println!("{} approved (workflow {workflow_id})", plan.title);
    Ok(())
}

// ── ITP ──

async fn load_template(ctx: &Ctx, project: &str, template_id: &str) -> anyhow::Result<ItpTemplate> {
    let assets: Vec<RawAsset> = ctx
        .api
        .list_assets(project, ITP_TEMPLATE_ASSET_TYPE)
        .await
        .context("failed to list ITP templates")?;
    let asset = assets
        .iter()
        .find(|a| a.id == template_id)
        .with_context(|| format!("ITP template {template_id} not found in project {project}"))?;
    Ok(ItpTemplate::from_asset(asset))
}

pub async fn itp_show(ctx: &Ctx, template_id: &str) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let template = load_template(ctx, project, template_id).await?;
    let ledger = ApprovalLedger::open(&ctx.ledger_dir)?;
    let tracker = ledger.load(project, template_id)?;
    let caps = siteqa_core::itp::Capabilities::for_role(ctx.role);
    print!("{}", display::itp_grid(&template, &tracker, caps, ctx.color));
    Ok(())
}

pub async fn itp_act(ctx: &Ctx, template_id: &str, point: &str, action: ApprovalAction) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let template = load_template(ctx, project, template_id).await?;
    let outcome = run_action(ctx, project, template, point, action, today()).await?;
    match outcome {
        CommandOutcome::Applied { message } => {
            println!("{message}");
            Ok(())
        }
        CommandOutcome::Rejected { reason } => bail!("{action} on {point} rejected: {reason}"),
    }
}

/// Execute one action against the ledger-backed session.
async fn run_action(
    ctx: &Ctx,
    project: &str,
    template: ItpTemplate,
    point: &str,
    action: ApprovalAction,
    today: NaiveDate,
) -> anyhow::Result<CommandOutcome> {
    let ledger = ApprovalLedger::open(&ctx.ledger_dir)
        .with_context(|| format!("cannot open ledger at {}", ctx.ledger_dir.display()))?;
    let tracker = ledger.load(project, &template.id)?;
    let sink = ledger.sink(project, &template.id);
    let mut session = ItpSession::new(template, tracker, ctx.role, sink);
    Ok(session.execute(point, action, today).await)
}

// ── Team ──

pub async fn team_list(ctx: &Ctx) -> anyhow::Result<()> {
    let members = ctx.api.list_team(ctx.project()?).await.context("failed to load team")?;
    print!("{}", display::team(&members));
    Ok(())
}

pub async fn team_add(ctx: &Ctx, email: &str, permissions: &[TeamPermission]) -> anyhow::Result<()> {
    ctx.api
        .add_member(ctx.project()?, email, permissions)
        .await
        .context("failed to add team member")?;
    println!("invited {}", email.trim());
    Ok(())
}

pub async fn team_remove(ctx: &Ctx, id: &str) -> anyhow::Result<()> {
    ctx.api
        .remove_member(ctx.project()?, id)
        .await
        .context("failed to remove team member")?;
    println!("removed {id}");
    Ok(())
}

/// Apply `edit` to the named members and push every change.
pub async fn team_edit<F>(ctx: &Ctx, ids: &[String], edit: F) -> anyhow::Result<()>
where
    F: Fn(&mut TeamMember),
{
    let project = ctx.project()?;
    let mut members = ctx.api.list_team(project).await.context("failed to load team")?;
    let edited = select_members(&mut members, ids, edit)?;

    let report = ctx.api.save_team(project, &edited).await;
    for id in &report.succeeded {
        println!("updated {id}");
    }
    for (id, err) in &report.failed {
        eprintln!("failed {id}: {err}");
    }
    if !report.is_complete() {
        bail!("{} of {} member updates failed", report.failed.len(), report.attempted());
    }
    Ok(())
}

fn select_members<F>(members: &mut [TeamMember], ids: &[String], edit: F) -> anyhow::Result<Vec<TeamMember>>
where
    F: Fn(&mut TeamMember),
{
    let mut edited = Vec::with_capacity(ids.len());
    for id in ids {
        let member = members
            .iter_mut()
            .find(|m| &m.id == id)
            .with_context(|| format!("no team member {id}"))?;
        edit(member);
        edited.push(member.clone());
    }
    Ok(edited)
}

// ── Attachments ──

pub async fn upload(ctx: &Ctx, asset: &str, row: &str, paths: &[PathBuf]) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        files.push(UploadFile::new(file_name(path), data));
    }

    let progress: Progress = Arc::new(|name: &str, status: &UploadStatus| {
        let mut err = std::io::stderr();
        match status {
            UploadStatus::Failed(reason) => {
                let _ = writeln!(err, "\r{name}: failed ({reason})");
            }
            UploadStatus::Done => {
                let _ = writeln!(err, "\r{name}: 100%");
            }
            other => {
                let _ = write!(err, "\r{name}: {:>3}%", other.percent());
            }
        }
    });
    let existing = ctx
        .api
        .list_attachments(asset, row)
        .await
        .context("failed to list the row's attachments")?
        .len();
    let report = ctx
        .api
        .upload_attachments(project, asset, row, existing, files, AttachmentLimits::default(), progress)
        .await
        .context("upload failed")?;

    for rejected in &report.rejected {
        println!("skipped {}: {}", rejected.file.filename, rejected.reason);
    }
    println!("uploaded {} of {} file(s)", report.success_count(), report.files.len());
    if report.partial_completion {
        println!("warning: server recorded only some of the uploaded files");
    }
    if let Some(warning) = &report.completion_warning {
        println!("warning: files uploaded but records not updated: {warning}");
    }
    if report.success_count() < report.files.len() {
        bail!("{} file(s) failed to upload", report.files.len() - report.success_count());
    }
    if !report.rejected.is_empty() {
        bail!("{} file(s) skipped", report.rejected.len());
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn attachments(ctx: &Ctx, asset: &str, row: &str, delete: Option<&str>) -> anyhow::Result<()> {
    if let Some(id) = delete {
        ctx.api
            .delete_attachment(asset, row, id)
            .await
            .context("failed to delete attachment")?;
        println!("deleted {id}");
        return Ok(());
    }
    let list = ctx.api.list_attachments(asset, row).await.context("failed to list attachments")?;
    if list.is_empty() {
        println!("no attachments");
    }
    for a in list {
        println!(
            "{:<38} {:<40} {:>10}  {}",
            a.id,
            a.file_name,
            a.size,
            a.content_type.as_deref().unwrap_or("application/octet-stream")
        );
    }
    Ok(())
}

// ── Sections ──

async fn load_editor(ctx: &Ctx, project: &str, plan_type: PlanType) -> anyhow::Result<SectionEditor> {
    let asset = ctx
        .api
        .fetch_plan_document(project, plan_type)
        .await
        .with_context(|| format!("failed to fetch the {plan_type} document"))?;
    Ok(SectionEditor::from_asset(&asset))
}

pub async fn section_show(ctx: &Ctx, plan_type: PlanType) -> anyhow::Result<()> {
    let editor = load_editor(ctx, ctx.project()?, plan_type).await?;
    println!(
        "{} (rev {}, next {})",
        editor.title(),
        editor.version(),
        next_letter_revision(editor.version())
    );
    print!("{}", outline(editor.sections()));
    Ok(())
}

fn outline(sections: &[PlanSection]) -> String {
    let mut top: Vec<&PlanSection> = sections.iter().collect();
    top.sort_by_key(|s| sort_key(s.heading_number.as_deref().unwrap_or("")));
    let mut out = String::new();
    for section in top {
        outline_into(&mut out, section, 0);
    }
    out
}

fn outline_into(out: &mut String, section: &PlanSection, depth: usize) {
    let number = section.heading_number.as_deref().unwrap_or("");
    out.push_str(&format!("{:indent$}{number} {}  [{}]\n", "", section.heading, section.id, indent = depth * 2));
    for child in section.sorted_children() {
        outline_into(out, child, depth + 1);
    }
}

pub async fn section_set(ctx: &Ctx, plan_type: PlanType, section: &str, patch: SectionPatch) -> anyhow::Result<()> {
    if patch.is_empty() {
        bail!("nothing to change: pass --heading, --heading-number, --body or --summary");
    }
    let project = ctx.project()?;
    let mut editor = load_editor(ctx, project, plan_type).await?;
    if !editor.update(section, patch) {
        bail!("section {section} is not in the {plan_type} document");
    }
    save(ctx, project, plan_type, &mut editor).await
}

pub async fn section_title(ctx: &Ctx, plan_type: PlanType, title: &str) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let mut editor = load_editor(ctx, project, plan_type).await?;
    editor.set_title(title);
    save(ctx, project, plan_type, &mut editor).await
}

async fn save(ctx: &Ctx, project: &str, plan_type: PlanType, editor: &mut SectionEditor) -> anyhow::Result<()> {
    let report = ctx.api.save_sections(project, plan_type, editor).await;
    for (id, err) in &report.failed {
        eprintln!("failed {id}: {err}");
    }
    if !report.is_complete() {
        bail!("{} change(s) were not saved", report.failed.len());
    }
    println!("saved {} section(s){}", report.saved.len(), if report.title_saved { " and title" } else { "" });
    Ok(())
}

pub async fn section_commit(ctx: &Ctx, plan_type: PlanType) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let mut editor = load_editor(ctx, project, plan_type).await?;
    let version = ctx
        .api
        .commit_revision(project, plan_type, &mut editor)
        .await
        .with_context(|| format!("failed to commit the {plan_type} revision"))?;
    info!(project, %plan_type, version = %version, "revision committed");
    println!("{} now at revision {version}", editor.title());
    Ok(())
}

// ── Registers ──

pub async fn register(ctx: &Ctx, kind: RegisterArg, filter: RegisterFilter) -> anyhow::Result<()> {
    let project = ctx.project()?;
    let today = today();
    let text = match kind {
        RegisterArg::Certificates => {
            let records = ctx.api.list_certificates(project).await?;
            let stats = CertificateStats::from_records(&records, today);
            display::certificates(&filter.apply(&records), stats, ctx.color)
        }
        RegisterArg::Materials => {
            let records = ctx.api.list_materials(project).await?;
            let stats = MaterialStats::from_records(&records, today);
            display::materials(&filter.apply(&records), stats, ctx.color)
        }
        RegisterArg::Methods => {
            let records = ctx.api.list_methods(project).await?;
            let stats = MethodStats::from_records(&records, today);
            display::methods(&filter.apply(&records), stats, ctx.color)
        }
        RegisterArg::MixDesigns => {
            let records = ctx.api.list_mix_designs(project).await?;
            let stats = MixDesignStats::from_records(&records);
            display::mix_designs(&filter.apply(&records), stats, ctx.color)
        }
    };
    print!("{text}");
    Ok(())
}

// ── Project ──

#[derive(Debug, Default)]
pub struct ProjectEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub client_name: Option<String>,
    pub status: Option<String>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

impl ProjectEdit {
    fn apply(self, project: &mut siteqa_core::Project) {
        let fields = [
            (self.name, &mut project.name),
            (self.description, &mut project.description),
            (self.location, &mut project.location),
            (self.client_name, &mut project.client_name),
            (self.status, &mut project.status),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        let flags = &mut project.settings.feature_flags;
        for flag in self.enable {
            flags.insert(flag, true);
        }
        for flag in self.disable {
            flags.insert(flag, false);
        }
    }
}

pub async fn project_show(ctx: &Ctx) -> anyhow::Result<()> {
    let project = ctx.api.get_project(ctx.project()?).await.context("failed to load project")?;
    println!("=== {} ===", project.name);
    println!("  {:<26} {}", "status", project.status);
    println!("  {:<26} {}", "location", project.location);
    println!("  {:<26} {}", "client", project.client_name);
    println!("  {:<26} {}", "compliance pack", project.settings.compliance_pack);
    for (flag, on) in &project.settings.feature_flags {
        println!("  {:<26} {}", flag, if *on { "on" } else { "off" });
    }
    Ok(())
}

pub async fn project_set(ctx: &Ctx, edit: ProjectEdit) -> anyhow::Result<()> {
    let mut project = ctx.api.get_project(ctx.project()?).await.context("failed to load project")?;
    edit.apply(&mut project);
    ctx.api.update_project(&project).await.context("failed to save project")?;
    println!("saved {}", project.name);
    Ok(())
}
