//! Draft/publish lifecycle shared by folders, media items and blogs.
//!
//! Every write resolves to a [`StatusChange`]: the status to persist plus
//! what to do with the approval stamp. Persistence adapters apply the change
//! verbatim, so the role rules live here and nowhere else.

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ContentStatus, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("role `{}` may not modify workflow content", .0.as_str())]
    ReadOnlyRole(Role),
    #[error("role `{}` may not approve or reject content", .0.as_str())]
    ApprovalDenied(Role),
    #[error("content is rejected through the dedicated reject transition")]
    RejectViaUpdate,
    #[error("a rejection reason is required")]
    MissingReason,
}

/// What happens to `approvedById`/`approvedAt` when a change is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Leave the stored stamp untouched.
    Keep,
    /// Overwrite the stamp with a fresh approver and time.
    Stamp { by: Uuid, at: OffsetDateTime },
    /// Null both approval columns.
    Clear,
}

/// A fully resolved status transition ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ContentStatus,
    pub approval: Approval,
    /// Stored verbatim; `None` clears any previous reason.
    pub rejection_reason: Option<String>,
}

impl StatusChange {
    /// The dedicated publish transition. Idempotent apart from re-stamping.
    pub fn publish(approver: Uuid, at: OffsetDateTime) -> Self {
        Self {
            status: ContentStatus::Published,
            approval: Approval::Stamp { by: approver, at },
            rejection_reason: None,
        }
    }

    pub fn reject(reason: &str) -> Result<Self, WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::MissingReason);
        }
        Ok(Self {
            status: ContentStatus::Rejected,
            approval: Approval::Clear,
            rejection_reason: Some(reason.to_string()),
        })
    }
}

/// Who is acting on a workflow entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn can_approve(&self) -> bool {
        self.role.satisfies(Role::Admin)
    }

    fn ensure_writer(&self) -> Result<(), WorkflowError> {
        if self.role.satisfies(Role::Contributor) {
            Ok(())
        } else {
            Err(WorkflowError::ReadOnlyRole(self.role))
        }
    }

    fn ensure_approver(&self) -> Result<(), WorkflowError> {
        self.ensure_writer()?;
        if self.can_approve() {
            Ok(())
        } else {
            Err(WorkflowError::ApprovalDenied(self.role))
        }
    }
}

/// Resolve the status for a create (`current == None`) or an update.
///
/// Contributors always land in DRAFT whatever they submitted. Approvers may
/// pick DRAFT or PUBLISHED; omitting the status keeps the current one on
/// update and means DRAFT on create. Editing rejected content without a
/// status sends it back to DRAFT for another review.
pub fn resolve_write(
    actor: Actor,
    requested: Option<ContentStatus>,
    current: Option<ContentStatus>,
    now: OffsetDateTime,
) -> Result<StatusChange, WorkflowError> {
    actor.ensure_writer()?;

    if !actor.can_approve() {
        return Ok(StatusChange {
            status: ContentStatus::Draft,
            approval: Approval::Clear,
            rejection_reason: None,
        });
    }

    let target = match (requested, current) {
        (Some(ContentStatus::Rejected), _) => return Err(WorkflowError::RejectViaUpdate),
        (Some(status), _) => status,
        (None, Some(ContentStatus::Rejected)) | (None, None) => ContentStatus::Draft,
        (None, Some(status)) => status,
    };

    let approval = match (target, current) {
        (ContentStatus::Published, Some(ContentStatus::Published)) => Approval::Keep,
        (ContentStatus::Published, _) => Approval::Stamp {
            by: actor.id,
            at: now,
        },
        (ContentStatus::Draft | ContentStatus::Rejected, _) => Approval::Clear,
    };

    Ok(StatusChange {
        status: target,
        approval,
        rejection_reason: None,
    })
}

/// Resolve the dedicated publish transition for `actor`.
pub fn resolve_publish(actor: Actor, now: OffsetDateTime) -> Result<StatusChange, WorkflowError> {
    actor.ensure_approver()?;
    Ok(StatusChange::publish(actor.id, now))
}

/// Resolve the reject transition for `actor`.
pub fn resolve_reject(actor: Actor, reason: &str) -> Result<StatusChange, WorkflowError> {
    actor.ensure_approver()?;
    StatusChange::reject(reason)
}
