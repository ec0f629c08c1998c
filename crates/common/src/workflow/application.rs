//! Adoption application transition table
//!
//! ```text
//! PENDING ⇄ REVIEWING ⇄ WAITLISTED ⇄ APPROVED ──(outcome)──▶ ADOPTED
//!    ▲          ▲                        │
//!    └── REJECTED, WITHDRAWN ◀───────────┘
//! ```
//!
//! ADOPTED is never a staff target; only outcome recording writes it.

use crate::db::models::ApplicationStatus;
use crate::errors::{AppError, Result};

use ApplicationStatus::*;

/// Statuses staff may pick from the review form
pub const STAFF_SETTABLE: [ApplicationStatus; 6] =
    [Pending, Reviewing, Waitlisted, Approved, Rejected, Withdrawn];

/// Targets reachable from `from` by a staff status update
pub fn staff_targets(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    match from {
        Pending | Reviewing | Waitlisted | Approved => &STAFF_SETTABLE,
        Rejected => &[Pending, Reviewing],
        Withdrawn => &[Pending],
        Adopted => &[],
    }
}

/// Closed from the applicant's side: nothing left to withdraw
pub fn is_closed(status: ApplicationStatus) -> bool {
    matches!(status, Adopted | Rejected | Withdrawn)
}

/// Check a staff status update against the table.
///
/// A same-status update is accepted so notes can be edited without moving
/// the application, except on ADOPTED which accepts nothing.
pub fn ensure_staff_transition(from: ApplicationStatus, to: ApplicationStatus) -> Result<()> {
    if to == Adopted {
        return Err(AppError::field(
            "status",
            "ADOPTED can only be set by recording an adoption outcome",
        ));
    }

    let allowed = from != Adopted && (from == to || staff_targets(from).contains(&to));
    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: "application",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
