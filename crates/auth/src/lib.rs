//! `gemledger-auth` — role checks at the ledger boundary.
//!
//! Authentication happens elsewhere; this crate only answers "may this actor,
//! acting inside this tenant, perform an operation that needs these roles?".

pub mod authorize;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, require_role};
pub use principal::Actor;
pub use roles::Role;
