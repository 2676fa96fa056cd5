//! Account management rules.

use crate::domain::error::DomainError;
use crate::domain::types::Role;

pub const LAST_SUPERADMIN: &str = "the last SUPERADMIN cannot be demoted or deleted";

/// A change to an existing account that may affect the SUPERADMIN count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Assign(Role),
    Delete,
}

/// Reject any change that would leave zero SUPERADMINs.
///
/// `superadmins` is the current count, read under the same lock that guards
/// the write.
pub fn guard_last_superadmin(
    target_role: Role,
    change: RoleChange,
    superadmins: u64,
) -> Result<(), DomainError> {
    let removes_superadmin = target_role == Role::Superadmin
        && match change {
            RoleChange::Assign(role) => role != Role::Superadmin,
            RoleChange::Delete => true,
        };

    if removes_superadmin && superadmins <= 1 {
        return Err(DomainError::conflict(LAST_SUPERADMIN));
    }
    Ok(())
}

/// Whether `actor` may touch an account currently holding `target`, and
/// optionally assign it `assigned`.
pub fn can_manage(actor: Role, target: Role, assigned: Option<Role>) -> bool {
    if !actor.satisfies(Role::Admin) {
        return false;
    }
    if target == Role::Superadmin && actor != Role::Superadmin {
        return false;
    }
    assigned.is_none_or(|role| role <= actor)
}
