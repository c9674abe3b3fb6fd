use thiserror::Error;

use gemledger_core::TenantId;

use crate::{Actor, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: role '{role}' may not {operation}")]
    Forbidden { role: String, operation: String },
}

/// Check that `actor` acts inside `tenant_id` and holds one of `allowed`.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn require_role(
    actor: &Actor,
    tenant_id: TenantId,
    allowed: &[Role],
    operation: &str,
) -> Result<(), AuthzError> {
    if actor.tenant_id != tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    if allowed.iter().any(|r| r == &actor.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: actor.role.to_string(),
            operation: operation.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_may_undo() {
        let tenant = TenantId::new();
        let actor = Actor::admin(tenant);
        assert!(require_role(&actor, tenant, &[Role::admin()], "undo sales").is_ok());
    }

    #[test]
    fn staff_may_not_undo() {
        let tenant = TenantId::new();
        let actor = Actor::staff(tenant);
        let err = require_role(&actor, tenant, &[Role::admin()], "undo sales").unwrap_err();
        assert_eq!(
            err.to_string(),
            "forbidden: role 'staff' may not undo sales"
        );
    }

    #[test]
    fn staff_may_sell() {
        let tenant = TenantId::new();
        let actor = Actor::staff(tenant);
        assert!(require_role(&actor, tenant, &[Role::admin(), Role::staff()], "sell").is_ok());
    }

    #[test]
    fn acting_in_another_tenant_is_rejected() {
        let actor = Actor::admin(TenantId::new());
        let err = require_role(&actor, TenantId::new(), &[Role::admin()], "sell").unwrap_err();
        assert_eq!(err, AuthzError::TenantMismatch);
    }

    #[test]
    fn custom_roles_compare_by_name() {
        assert_eq!(Role::new("admin"), Role::admin());
        assert!(Role::new(String::from("admin")).is_admin());
        assert!(!Role::new("viewer").is_admin());
    }
}
