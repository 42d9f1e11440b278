//! Session domain types — Role, Actor, Registration, ProfilePatch, SessionSnapshot
//!
//! Serializable, cloneable, and cheap to pass around. Wire names follow the
//! record store's camelCase fields (`fullName`, `createdAt`, …).

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{IdentityError, Result};
use crate::schema;

/// The three roles an actor can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Tutor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Tutor => "tutor",
            Self::Student => "student",
        }
    }

    /// Exact, case-sensitive match; anything else is not a role
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "tutor" => Some(Self::Tutor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn all() -> &'static [Role] {
        &[Self::Admin, Self::Tutor, Self::Student]
    }

    /// Label shown next to the actor's name
    pub fn display_name(role: Option<Role>) -> &'static str {
        match role {
            Some(Self::Admin) => "Administrator",
            Some(Self::Tutor) => "Tutor",
            Some(Self::Student) => "Student",
            None => "User",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids arrive as strings or numbers depending on who created the record
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// The authenticated identity
///
/// `role` is kept as the raw string the store sent; [`Actor::role`] parses
/// it, and an actor whose role does not parse is never authorized for
/// anything. Fields the core does not model are carried in `extra` so a
/// persisted actor restores exactly as it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, rename = "role")]
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Actor {
    /// Build an actor from a `users` record, dropping the stored password
    pub fn from_record(record: Value) -> Result<Self> {
        let Value::Object(mut fields) = record else {
            return Err(IdentityError::Serialization(
                "user record must be a JSON object".into(),
            ));
        };
        fields.remove(schema::FIELD_PASSWORD);
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Parsed role, `None` when the stored role is not one of the three
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role_name)
    }

    pub fn has_valid_role(&self) -> bool {
        self.role().is_some()
    }

    /// Full name, falling back to the email
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            self.email.as_str()
        } else {
            name
        }
    }
}

/// New-account submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Minimum password length accepted at registration and reset
pub const MIN_PASSWORD_LEN: usize = 6;

/// `local@domain.tld` with no whitespace
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: full_name.into(),
            role,
            phone: None,
            address: None,
            avatar: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Local checks, run before anything is sent to the store
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(IdentityError::RegistrationFailed("Full name is required".into()));
        }
        if !is_plausible_email(&self.email) {
            return Err(IdentityError::RegistrationFailed("Invalid email address".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::RegistrationFailed(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Record submitted to `users`: the registration plus id, timestamps and status
    pub fn into_record(self, id: &str) -> Result<Value> {
        let Value::Object(mut fields) = serde_json::to_value(self)? else {
            return Err(IdentityError::Serialization("registration is not an object".into()));
        };
        fields.insert(schema::FIELD_ID.into(), Value::String(id.to_string()));
        fields.insert(
            schema::FIELD_CREATED_AT.into(),
            Value::String(Utc::now().to_rfc3339()),
        );
        fields.insert("isActive".into(), Value::Bool(true));
        Ok(Value::Object(fields))
    }
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_name(mut self, value: impl Into<String>) -> Self {
        self.full_name = Some(value.into());
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn phone(mut self, value: impl Into<String>) -> Self {
        self.phone = Some(value.into());
        self
    }

    pub fn address(mut self, value: impl Into<String>) -> Self {
        self.address = Some(value.into());
        self
    }

    pub fn bio(mut self, value: impl Into<String>) -> Self {
        self.bio = Some(value.into());
        self
    }

    pub fn avatar(mut self, value: impl Into<String>) -> Self {
        self.avatar = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What the rest of the application can observe about the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub actor: Option<Actor>,
    /// `true` until the durable slot has been consulted: "unknown, do not decide yet"
    pub initializing: bool,
}

impl SessionSnapshot {
    /// `{actor: none, initializing: true}`
    pub fn initial() -> Self {
        Self {
            actor: None,
            initializing: true,
        }
    }

    pub fn settled(actor: Option<Actor>) -> Self {
        Self {
            actor,
            initializing: false,
        }
    }

    /// Role of an actor that may be authorized; invalid roles count as none
    pub fn authorized_role(&self) -> Option<Role> {
        self.actor.as_ref().and_then(Actor::role)
    }

    pub fn is_authenticated(&self) -> bool {
        !self.initializing && self.authorized_role().is_some()
    }

    pub fn user_info(&self) -> UserInfo {
        let role = self.authorized_role();
        UserInfo {
            user_id: self
                .actor
                .as_ref()
                .filter(|_| role.is_some())
                .map(|a| a.id.clone()),
            role,
            is_authenticated: role.is_some(),
            is_admin: role == Some(Role::Admin),
            is_tutor: role == Some(Role::Tutor),
            is_student: role == Some(Role::Student),
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Flattened view of the current actor for screens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserInfo {
    pub user_id: Option<String>,
    pub role: Option<Role>,
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub is_tutor: bool,
    pub is_student: bool,
}

/// UI-facing result of a session operation
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub actor: Option<Actor>,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            actor: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            actor: None,
        }
    }

    /// Fold a mutator's result into an outcome the UI can render
    pub fn from_result(result: Result<Actor>, success_message: &str) -> Self {
        match result {
            Ok(actor) => Self {
                success: true,
                message: success_message.to_string(),
                actor: Some(actor),
            },
            Err(err) => Self::failed(err.to_string()),
        }
    }
}
