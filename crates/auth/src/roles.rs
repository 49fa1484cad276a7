use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// The storefront only knows two roles: `admin` and `customer`. They are kept as
/// opaque strings so tokens stay forward compatible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const CUSTOMER: &'static str = "customer";

    pub fn admin() -> Self {
        Self(Cow::Borrowed(Self::ADMIN))
    }

    pub fn customer() -> Self {
        Self(Cow::Borrowed(Self::CUSTOMER))
    }

    /// Roles granted to a user account.
    pub fn for_account(is_admin: bool) -> Vec<Role> {
        if is_admin {
            vec![Self::admin(), Self::customer()]
        } else {
            vec![Self::customer()]
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
