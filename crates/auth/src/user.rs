//! User account aggregate.
//!
//! Email uniqueness spans accounts and is enforced by the caller through the
//! repository lookup; this aggregate owns per-account validation only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateRoot, DomainError, DomainEvent, UserId};

use crate::Role;

/// Canonical form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("Invalid email address"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("Name is required"));
    }
    Ok(())
}

/// Aggregate root: UserAccount.
///
/// # Invariants
/// - `email` is stored normalized (trimmed, lowercase).
/// - `password_hash` is never empty once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(rename = "_id")]
    id: UserId,
    name: String,
    email: String,
    #[serde(rename = "password")]
    password_hash: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v")]
    version: u64,
}

impl UserAccount {
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            password_hash: String::new(),
            is_admin: false,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn roles(&self) -> Vec<Role> {
        Role::for_account(self.is_admin)
    }

    pub fn is_registered(&self) -> bool {
        self.version > 0
    }
}

impl AggregateRoot for UserAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterUser. The password arrives already hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProfile. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
    UpdateProfile(UpdateProfile),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    ProfileUpdated(ProfileUpdated),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "auth.user.registered",
            UserEvent::ProfileUpdated(_) => "auth.user.profile_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::ProfileUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for UserAccount {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => {
                self.id = e.user_id;
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.password_hash = e.password_hash.clone();
                self.is_admin = e.is_admin;
                self.created_at = e.occurred_at;
                self.updated_at = e.occurred_at;
            }
            UserEvent::ProfileUpdated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(email) = &e.email {
                    self.email = email.clone();
                }
                if let Some(hash) = &e.password_hash {
                    self.password_hash = hash.clone();
                }
                self.updated_at = e.occurred_at;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
            UserCommand::UpdateProfile(cmd) => self.handle_update_profile(cmd),
        }
    }
}

impl UserAccount {
    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.is_registered() {
            return Err(DomainError::conflict("user already exists"));
        }

        validate_name(&cmd.name)?;
        let email = normalize_email(&cmd.email);
        validate_email(&email)?;
        if cmd.password_hash.is_empty() {
            return Err(DomainError::invariant("password hash is required"));
        }

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            name: cmd.name.trim().to_string(),
            email,
            password_hash: cmd.password_hash.clone(),
            is_admin: cmd.is_admin,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_profile(&self, cmd: &UpdateProfile) -> Result<Vec<UserEvent>, DomainError> {
        if !self.is_registered() {
            return Err(DomainError::NotFound);
        }
        if cmd.user_id != self.id {
            return Err(DomainError::invariant("user_id mismatch"));
        }

        let name = match &cmd.name {
            Some(n) => {
                validate_name(n)?;
                Some(n.trim().to_string())
            }
            None => None,
        };
        let email = match &cmd.email {
            Some(e) => {
                let e = normalize_email(e);
                validate_email(&e)?;
                Some(e)
            }
            None => None,
        };
        if cmd.password_hash.as_deref() == Some("") {
            return Err(DomainError::invariant("password hash is required"));
        }

        Ok(vec![UserEvent::ProfileUpdated(ProfileUpdated {
            user_id: cmd.user_id,
            name,
            email,
            password_hash: cmd.password_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
