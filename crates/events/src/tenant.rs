use gemledger_core::TenantId;

/// Marks records that belong to exactly one tenant.
///
/// Used by sinks and stores to filter on the `ownerId` boundary without
/// knowing the concrete record type.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}
