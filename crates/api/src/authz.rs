//! API-side authorization guard.
//!
//! Enforced in handlers before dispatch, keeping aggregates and infra auth-agnostic.

use storefront_auth::{Permission, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Fail with 403 unless the caller holds `permission`.
pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), ApiError> {
    authorize(&principal.principal(), &Permission::of(permission))
        .map_err(|e| ApiError::Forbidden(e.to_string()))
}

/// Whether the caller holds `permission`, without failing.
pub fn allows(principal: &PrincipalContext, permission: &'static str) -> bool {
    require(principal, permission).is_ok()
}
