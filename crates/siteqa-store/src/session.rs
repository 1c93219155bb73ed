//! Confirmed ITP execution.
//!
//! [`ItpSession`] runs every approval action as a command: propose the
//! transition, build the tracker it would produce, hand both to an
//! [`ApprovalSink`], and adopt the new tracker only once the sink accepts.
//! A rejected command leaves the session exactly as it was.

use async_trait::async_trait;
use chrono::NaiveDate;
use siteqa_core::itp::{ApprovalAction, ApprovalTracker, Capabilities, ItpTemplate, Transition};
use siteqa_core::role::Role;
use tracing::{info, warn};

use crate::StoreError;

/// Somewhere approval transitions are confirmed before they take effect.
#[async_trait]
pub trait ApprovalSink: Send + Sync {
    /// Accept `transition`, whose result is `next`, or refuse it.
    async fn confirm(&self, transition: &Transition, next: &ApprovalTracker) -> Result<(), StoreError>;
}

/// Tagged result of one approval command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied { message: &'static str },
    Rejected { reason: String },
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied { .. })
    }
}

pub struct ItpSession<S> {
    template: ItpTemplate,
    tracker: ApprovalTracker,
    role: Role,
    sink: S,
}

impl<S: ApprovalSink> ItpSession<S> {
    pub fn new(template: ItpTemplate, tracker: ApprovalTracker, role: Role, sink: S) -> Self {
        Self {
            template,
            tracker,
            role,
            sink,
        }
    }

    pub fn template(&self) -> &ItpTemplate {
        &self.template
    }

    pub fn tracker(&self) -> &ApprovalTracker {
        &self.tracker
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(self.role)
    }

    /// Run `action` on `point_id` as this session's role.
    pub async fn execute(&mut self, point_id: &str, action: ApprovalAction, today: NaiveDate) -> CommandOutcome {
        if let Err(e) = self.template.check_action(point_id, action) {
            return reject(e.to_string());
        }
        let transition = match self.tracker.propose(point_id, self.role, action, today) {
            Ok(t) => t,
            Err(e) => return reject(e.to_string()),
        };

        let mut next = self.tracker.clone();
        let message = match next.commit(transition.clone()) {
            Ok(m) => m,
            Err(e) => return reject(e.to_string()),
        };

        if let Err(e) = self.sink.confirm(&transition, &next).await {
            return reject(e.to_string());
        }

        self.tracker = next;
        info!(point_id, %action, role = %self.role, "{message}");
        CommandOutcome::Applied { message }
    }
}

fn reject(reason: String) -> CommandOutcome {
    warn!(%reason, "approval command rejected");
    CommandOutcome::Rejected { reason }
}
