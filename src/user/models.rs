use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A Proxmox VE user identifier of the form `name@realm`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UserIdError {
    #[error("user ID '{0}' must include an authentication realm (name@realm)")]
    MissingRealm(String),

    #[error("user ID '{0}' has an empty user name")]
    EmptyName(String),

    #[error("user ID '{0}' has an empty realm")]
    EmptyRealm(String),

    #[error("user ID '{0}' contains whitespace, ':' or '/'")]
    InvalidCharacter(String),
}

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, UserIdError> {
        if raw
            .chars()
            .any(|c| c.is_whitespace() || c == ':' || c == '/')
        {
            return Err(UserIdError::InvalidCharacter(raw.to_string()));
        }

        let (name, realm) = raw
            .rsplit_once('@')
            .ok_or_else(|| UserIdError::MissingRealm(raw.to_string()))?;

        if name.is_empty() {
            return Err(UserIdError::EmptyName(raw.to_string()));
        }
        if realm.is_empty() {
            return Err(UserIdError::EmptyRealm(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn name(&self) -> &str {
        self.0.rsplit_once('@').map(|(name, _)| name).unwrap_or(&self.0)
    }

    pub fn realm(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, realm)| realm).unwrap_or_default()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether the user should exist on the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

impl DesiredState {
    pub fn as_str(self) -> &'static str {
        match self {
            DesiredState::Present => "present",
            DesiredState::Absent => "absent",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired attributes of a user
#[derive(Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub comment: Option<String>,
    pub email: Option<String>,
    pub enable: bool,
    /// Expiration in seconds since epoch, 0 never expires
    pub expire: i64,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub groups: Option<Vec<String>>,
    /// Two factor authentication keys (yubico)
    pub keys: Option<String>,
    /// Only used when the user is created, or re-applied on update when non-empty
    pub password: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            comment: None,
            email: None,
            enable: true,
            expire: 0,
            firstname: None,
            lastname: None,
            groups: None,
            keys: None,
            password: None,
        }
    }
}

impl UserProfile {
    /// Groups trimmed, without empties, sorted and deduplicated
    pub fn sanitized_groups(&self) -> Option<Vec<String>> {
        let groups = self.groups.as_ref()?;
        let mut groups: Vec<String> = groups
            .iter()
            .map(|group| group.trim().to_string())
            .filter(|group| !group.is_empty())
            .collect();

        groups.sort();
        groups.dedup();
        Some(groups)
    }

    /// The password, if one was given and is not empty
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserProfile")
            .field("comment", &self.comment)
            .field("email", &self.email)
            .field("enable", &self.enable)
            .field("expire", &self.expire)
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("groups", &self.groups)
            .field("keys", &self.keys.as_ref().map(|_| "********"))
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// What a reconcile run did, or would have done in check mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Deleted,
    NotFound,
    WouldCreate,
    WouldUpdate,
    WouldDelete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
            Action::NotFound => "not_found",
            Action::WouldCreate => "would_create",
            Action::WouldUpdate => "would_update",
            Action::WouldDelete => "would_delete",
        }
    }
}

/// Result reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub userid: String,
    pub changed: bool,
    pub msg: String,
    #[serde(skip)]
    pub action: Action,
}

impl Outcome {
    pub fn new(userid: &UserId, action: Action, changed: bool, msg: String) -> Self {
        Self {
            userid: userid.to_string(),
            changed,
            msg,
            action,
        }
    }
}
