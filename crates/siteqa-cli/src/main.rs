//! `siteqa`: command-line client for project quality assurance.
//!
//! Reviews management plans, runs ITP sign-offs against a local ledger,
//! manages the project team, uploads row attachments and browses registers.

mod commands;
mod display;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use siteqa_core::team::{Preset, TeamPermission};
use siteqa_core::{ApprovalAction, PlanType, Role};
use siteqa_sync::{ApiClient, ClientConfig};
use tracing_subscriber::EnvFilter;

/// SiteQA command-line client.
#[derive(Parser, Debug)]
#[command(name = "siteqa", version, about = "SiteQA project QA client")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "SITEQA_API_URL", default_value = "http://localhost:3000", global = true)]
    api_url: String,

    /// Bearer token for the backend.
    #[arg(long, env = "SITEQA_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Project id.
    #[arg(long, env = "SITEQA_PROJECT", global = true)]
    project: Option<String>,

    /// Role to act as for ITP sign-offs.
    #[arg(long, env = "SITEQA_ROLE", default_value = "site_engineer", global = true)]
    role: Role,

    /// Directory holding the local approval ledger.
    #[arg(long, env = "SITEQA_LEDGER_DIR", default_value = ".siteqa", global = true)]
    ledger_dir: PathBuf,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Disable coloured status cells.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Management plan board.
    Plans {
        #[command(subcommand)]
        action: Option<PlansAction>,
    },

    /// Inspection & test plan sign-offs.
    Itp {
        #[command(subcommand)]
        action: ItpAction,
    },

    /// Project team membership.
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },

    /// Upload files to an ITP row.
    Upload {
        /// ITP template asset id.
        asset: String,
        /// Row id within the template.
        row: String,
        /// Files to upload (3 per row, 10 MiB each; oversized files are skipped).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List or delete a row's attachments.
    Attachments {
        asset: String,
        row: String,
        /// Delete the attachment with this id.
        #[arg(long)]
        delete: Option<String>,
    },

    /// Edit management plan documents.
    Section {
        #[command(subcommand)]
        action: SectionAction,
    },

    /// Browse a register.
    Register {
        kind: RegisterArg,
        /// Case-insensitive search over code, name and a third key field.
        #[arg(long)]
        search: Option<String>,
        /// Type or category filter ("all" for none).
        #[arg(long = "kind")]
        kind_filter: Option<String>,
        /// Status filter ("all" for none).
        #[arg(long)]
        status: Option<String>,
    },

    /// Show or update project settings.
    Project {
        #[command(subcommand)]
        action: Option<ProjectAction>,
    },
}

#[derive(Subcommand, Debug)]
enum PlansAction {
    /// Approve a plan, creating its approval workflow if needed.
    Approve { plan_type: PlanType },
}

#[derive(Subcommand, Debug)]
enum ItpAction {
    /// Show the sign-off grid.
    Show { template: String },
    /// Apply an action to one point.
    Act {
        template: String,
        point: String,
        /// check-sub, check-eng, uncheck-sub, uncheck-eng, approve, unapprove,
        /// hold-request, hold-cancel, hold-release, witness-request,
        /// witness-cancel, witness-notify, attach
        action: ApprovalAction,
    },
}

#[derive(Subcommand, Debug)]
enum TeamAction {
    List,
    /// Invite a member by email.
    Add {
        email: String,
        /// Comma-separated flags; defaults to read.
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<TeamPermission>,
    },
    Remove { id: String },
    /// Replace members' flags with a preset.
    Preset {
        preset: Preset,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Grant {
        permission: TeamPermission,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Revoke {
        permission: TeamPermission,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SectionAction {
    /// Outline of a plan document.
    Show { plan_type: PlanType },
    /// Edit one section and save.
    Set {
        plan_type: PlanType,
        section: String,
        #[arg(long)]
        heading: Option<String>,
        #[arg(long)]
        heading_number: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        summary: Option<String>,
    },
    /// Rename a plan document.
    Title { plan_type: PlanType, title: String },
    /// Commit a new revision.
    Commit { plan_type: PlanType },
}

#[derive(Subcommand, Debug)]
enum ProjectAction {
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        client_name: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Feature flags to switch on.
        #[arg(long, value_delimiter = ',')]
        enable: Vec<String>,
        /// Feature flags to switch off.
        #[arg(long, value_delimiter = ',')]
        disable: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RegisterArg {
    Certificates,
    Materials,
    Methods,
    MixDesigns,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("siteqa v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::new(&cli.api_url)
        .with_token(cli.token.clone())
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    let api = ApiClient::new(config).context("failed to build HTTP client")?;
    let ctx = commands::Ctx::new(api, &cli);

    match cli.command {
        Commands::Plans { action } => match action {
            None => commands::plans(&ctx).await,
            Some(PlansAction::Approve { plan_type }) => commands::approve_plan(&ctx, plan_type).await,
        },
        Commands::Itp { action } => match action {
            ItpAction::Show { template } => commands::itp_show(&ctx, &template).await,
            ItpAction::Act {
                template,
                point,
                action,
            } => commands::itp_act(&ctx, &template, &point, action).await,
        },
        Commands::Team { action } => match action {
            TeamAction::List => commands::team_list(&ctx).await,
            TeamAction::Add { email, permissions } => commands::team_add(&ctx, &email, &permissions).await,
            TeamAction::Remove { id } => commands::team_remove(&ctx, &id).await,
            TeamAction::Preset { preset, ids } => {
                commands::team_edit(&ctx, &ids, |m| m.apply_preset(preset)).await
            }
            TeamAction::Grant { permission, ids } => {
                commands::team_edit(&ctx, &ids, |m| m.grant(permission)).await
            }
            TeamAction::Revoke { permission, ids } => {
                commands::team_edit(&ctx, &ids, |m| m.revoke(permission)).await
            }
        },
        Commands::Upload { asset, row, files } => commands::upload(&ctx, &asset, &row, &files).await,
        Commands::Attachments { asset, row, delete } => {
            commands::attachments(&ctx, &asset, &row, delete.as_deref()).await
        }
        Commands::Section { action } => match action {
            SectionAction::Show { plan_type } => commands::section_show(&ctx, plan_type).await,
            SectionAction::Set {
                plan_type,
                section,
                heading,
                heading_number,
                body,
                summary,
            } => {
                let patch = siteqa_core::SectionPatch {
                    heading,
                    heading_number,
                    body,
                    summary,
                    ..Default::default()
                };
                commands::section_set(&ctx, plan_type, &section, patch).await
            }
            SectionAction::Title { plan_type, title } => commands::section_title(&ctx, plan_type, &title).await,
            SectionAction::Commit { plan_type } => commands::section_commit(&ctx, plan_type).await,
        },
        Commands::Register {
            kind,
            search,
            kind_filter,
            status,
        } => {
            let filter = siteqa_core::register::RegisterFilter {
                search,
                kind: kind_filter,
                status,
            };
            commands::register(&ctx, kind, filter).await
        }
        Commands::Project { action } => match action {
            None => commands::project_show(&ctx).await,
            Some(ProjectAction::Set {
                name,
                description,
                location,
                client_name,
                status,
                enable,
                disable,
            }) => {
                let edit = commands::ProjectEdit {
                    name,
                    description,
                    location,
                    client_name,
                    status,
                    enable,
                    disable,
                };
                commands::project_set(&ctx, edit).await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_itp_action_names() {
        let cli = Cli::try_parse_from([
            "siteqa", "--project", "p1", "--role", "qa_manager", "itp", "act", "itp-1", "hp1", "hold-release",
        ])
        .unwrap();
        assert_eq!(cli.role, Role::QaManager);
        match cli.command {
            Commands::Itp {
                action: ItpAction::Act { action, .. },
            } => assert_eq!(action, ApprovalAction::ReleaseHoldPoint),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(Cli::try_parse_from(["siteqa", "itp", "act", "t", "p", "sign"]).is_err());
    }

    #[test]
    fn team_flags_split_on_commas() {
        let cli = Cli::try_parse_from(["siteqa", "team", "add", "a@b.co", "--permissions", "read,site"]).unwrap();
        match cli.command {
            Commands::Team {
                action: TeamAction::Add { permissions, .. },
            } => assert_eq!(permissions, vec![TeamPermission::Read, TeamPermission::Site]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn register_kind_uses_kebab_case() {
        let cli = Cli::try_parse_from(["siteqa", "register", "mix-designs", "--status", "approved"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Register {
                kind: RegisterArg::MixDesigns,
                ..
            }
        ));
    }
}
