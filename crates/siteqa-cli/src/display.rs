//! Terminal rendering for plans, ITP grids, team members and registers.
//!
//! Every renderer returns a `String` so callers decide where it goes.
//! Status cells are coloured by [`Tone`] when `color` is set.

use std::fmt::Write;

use chrono::NaiveDate;
use siteqa_core::itp::{Capabilities, InspectionPointApproval, ItpTemplate};
use siteqa_core::register::{
    Certificate, CertificateStats, Material, MaterialStats, MethodStats, MixDesign, MixDesignStats,
    TestMethod,
};
use siteqa_core::status::{style_of, PlanStatus};
use siteqa_core::{ApprovalTracker, StatusStyle, Styled, TeamMember, TeamPermission, Tone};
use siteqa_sync::PlanBoard;

const RESET: &str = "\x1b[0m";

fn paint(style: &StatusStyle, width: usize, color: bool) -> String {
    let cell = format!("{:<width$}", style.label);
    if color && style.tone != Tone::Neutral {
        format!("{}{cell}{RESET}", style.tone.ansi())
    } else {
        cell
    }
}

fn date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".into())
}

fn tick(flag: bool) -> &'static str {
    if flag { "x" } else { "." }
}

// ── Plans ──

pub fn plan_board(board: &PlanBoard, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<40} {:<18} {:<20} {}", "TYPE", "TITLE", "STATUS", "CLIENT", "REV");
    for plan in &board.plans {
        let _ = writeln!(
            out,
            "{:<6} {:<40} {} {} {}",
            plan.plan_type,
            truncate(&plan.title, 40),
            paint(&style_of::<PlanStatus>(&plan.status), 18, color),
            paint(&plan.client_status.style(), 20, color),
            plan.revision.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(out);
    if board.summary.nothing_published() {
        let _ = writeln!(out, "No plans have been published yet.");
    } else {
        let _ = writeln!(
            out,
            "{} plans, {} approved, {} need attention",
            board.summary.total, board.summary.approved, board.summary.needs_attention
        );
    }
    if let Some(jurisdiction) = &board.jurisdiction {
        let _ = writeln!(out, "Jurisdiction: {jurisdiction}");
    }
    out
}

// ── ITP ──

pub fn itp_grid(template: &ItpTemplate, tracker: &ApprovalTracker, caps: Capabilities, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} (rev {}) ===", template.name, template.revision);
    let _ = writeln!(
        out,
        "{:<14} {:<6} {:<44} {:<3} {:<3} {:<10} {:<14} {}",
        "POINT", "NO", "DESCRIPTION", "SUB", "ENG", "QA", "HOLD", "WITNESS"
    );
    for (i, point) in template.points.iter().enumerate() {
        let Some(id) = template.point_id(i) else { continue };
        if point.is_section() {
            let _ = writeln!(out, "-- {} {}", point.number_label(), point.label());
            continue;
        }
        let record: InspectionPointApproval = tracker.record(&id);
        let hold = if point.is_hold_point() {
            paint(&record.hold_point.style(), 14, color)
        } else {
            format!("{:<14}", "")
        };
        let witness = if point.is_witness_point() {
            paint(&record.witness_point.style(), 14, color)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{:<14} {:<6} {:<44} {:<3} {:<3} {:<10} {} {}",
            truncate(&id, 14),
            point.number_label(),
            truncate(point.label(), 44),
            tick(record.subcontractor_checked()),
            tick(record.engineer_checked()),
            date(record.qa),
            hold,
            witness.trim_end(),
        );
    }
    let mut can = Vec::new();
    if caps.can_check {
        can.push("check");
    }
    if caps.can_approve {
        can.push("approve");
    }
    if caps.can_release_hold_point {
        can.push("release hold points");
    }
    if caps.can_submit_for_approval {
        can.push("submit for approval");
    }
    let _ = writeln!(out);
    if can.is_empty() {
        let _ = writeln!(out, "Read-only for this role.");
    } else {
        let _ = writeln!(out, "This role can: {}", can.join(", "));
    }
    out
}

// ── Team ──

pub fn team(members: &[TeamMember]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:<38} {:<32}", "ID", "MEMBER");
    for flag in TeamPermission::ALL {
        let _ = write!(out, " {:<6}", short(flag));
    }
    let _ = writeln!(out);
    for member in members {
        let _ = write!(out, "{:<38} {:<32}", member.id, truncate(member.display_name(), 32));
        for flag in TeamPermission::ALL {
            let _ = write!(out, " {:<6}", tick(member.has(flag)));
        }
        let _ = writeln!(out);
    }
    out
}

fn short(flag: TeamPermission) -> &'static str {
    match flag {
        TeamPermission::PortalClient => "portal",
        other => other.code(),
    }
}

// ── Registers ──

pub fn certificates(records: &[&Certificate], stats: CertificateStats, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:<36} {:<14} {:<10} {}", "NUMBER", "TITLE", "TYPE", "STATUS", "EXPIRES");
    for c in records {
        let _ = writeln!(
            out,
            "{:<16} {:<36} {} {} {}",
            truncate(&c.certificate_number, 16),
            truncate(&c.title, 36),
            paint(&c.type_style(), 14, color),
            paint(&c.status_style(), 10, color),
            c.expiry_date.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(
        out,
        "\n{} total, {} valid, {} expired, {} expiring soon",
        stats.total, stats.valid, stats.expired, stats.expiring_soon
    );
    out
}

pub fn materials(records: &[&Material], stats: MaterialStats, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:<32} {:<18} {:<12} {}", "CODE", "NAME", "STATUS", "QUALITY", "REMAINING");
    for m in records {
        let _ = writeln!(
            out,
            "{:<14} {:<32} {} {} {} {}",
            truncate(&m.material_code, 14),
            truncate(&m.name, 32),
            paint(&m.status_style(), 18, color),
            paint(&m.quality_style(), 12, color),
            m.quantity_remaining,
            m.unit_of_measure,
        );
    }
    let _ = writeln!(
        out,
        "\n{} total, {} approved, {} pending, {} expired, {} low stock",
        stats.total, stats.approved, stats.pending, stats.expired, stats.low_stock
    );
    out
}

pub fn methods(records: &[&TestMethod], stats: MethodStats, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:<36} {:<20} {:<12} {}", "CODE", "NAME", "STANDARD", "STATUS", "NEXT REVIEW");
    for m in records {
        let _ = writeln!(
            out,
            "{:<14} {:<36} {:<20} {} {}",
            truncate(&m.code, 14),
            truncate(&m.name, 36),
            truncate(&m.standard_reference, 20),
            paint(&m.status_style(), 12, color),
            m.next_review_date.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(
        out,
        "\n{} total, {} approved, {} review overdue",
        stats.total, stats.approved, stats.review_overdue
    );
    out
}

pub fn mix_designs(records: &[&MixDesign], stats: MixDesignStats, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:<30} {:<8} {:<12} {:<10} {}", "CODE", "NAME", "GRADE", "STATUS", "WORKABLE", "MPa");
    for d in records {
        let strength = d.target_strength.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "{:<12} {:<30} {:<8} {} {} {}",
            truncate(&d.mix_design_code, 12),
            truncate(&d.name, 30),
            d.concrete_grade,
            paint(&d.status_style(), 12, color),
            paint(&d.workability_style(), 10, color),
            strength,
        );
    }
    let _ = writeln!(
        out,
        "\n{} total, {} approved, {} draft, {} tested",
        stats.total, stats.approved, stats.draft, stats.tested
    );
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
