//! `storefront-auth` — authentication/authorization boundary.
//!
//! Token issuing/validation, password hashing, role policy and the user
//! account aggregate. Intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError};
pub use password::{hash_password, verify_password, PasswordError, MIN_PASSWORD_LENGTH};
pub use permissions::Permission;
pub use roles::Role;
pub use user::{
    normalize_email, ProfileUpdated, RegisterUser, UpdateProfile, UserAccount, UserCommand,
    UserEvent, UserRegistered,
};
