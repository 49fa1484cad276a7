use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.place").
/// The wildcard permission `"*"` grants everything and is only handed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";
    pub const CATALOG_WRITE: &'static str = "catalog.write";
    pub const REVIEWS_WRITE: &'static str = "reviews.write";
    pub const ORDERS_PLACE: &'static str = "orders.place";
    pub const ORDERS_READ_OWN: &'static str = "orders.read_own";
    pub const ORDERS_PAY_OWN: &'static str = "orders.pay_own";
    pub const ORDERS_READ_ANY: &'static str = "orders.read_any";
    pub const ORDERS_DELIVER: &'static str = "orders.deliver";
    pub const PROFILE_MANAGE: &'static str = "profile.manage";

    pub const fn of(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }

    /// Static role → permission policy.
    pub fn granted_to(role: &Role) -> Vec<Permission> {
        match role.as_str() {
            Role::ADMIN => vec![Self::of(Self::WILDCARD)],
            Role::CUSTOMER => [
                Self::REVIEWS_WRITE,
                Self::ORDERS_PLACE,
                Self::ORDERS_READ_OWN,
                Self::ORDERS_PAY_OWN,
                Self::PROFILE_MANAGE,
            ]
            .into_iter()
            .map(Self::of)
            .collect(),
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
