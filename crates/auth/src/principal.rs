use serde::{Deserialize, Serialize};

use gemledger_core::{TenantId, UserId};

use crate::Role;

/// The authenticated user performing a ledger operation.
///
/// `tenant_id` is the tenant the actor is acting in; every read and write the
/// ledger performs on the actor's behalf is scoped to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
        }
    }

    pub fn admin(tenant_id: TenantId) -> Self {
        Self::new(UserId::new(), tenant_id, Role::admin())
    }

    pub fn staff(tenant_id: TenantId) -> Self {
        Self::new(UserId::new(), tenant_id, Role::staff())
    }
}
