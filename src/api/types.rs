use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::user::UserProfile;

/// One entry of `GET /access/users`, as returned by the user lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub userid: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub enable: Option<bool>,
    #[serde(default)]
    pub expire: Option<i64>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "group_list")]
    pub groups: Vec<String>,
}

// PVE renders booleans as 0/1, some versions as true/false
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|n| n != 0),
        Some(serde_json::Value::String(s)) => Some(s != "0" && !s.is_empty()),
        _ => None,
    })
}

// Groups come back either as "a,b" or ["a", "b"]
fn group_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}

/// Form fields sent on create and update
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    pub comment: Option<String>,
    pub email: Option<String>,
    pub enable: u8,
    pub expire: i64,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub groups: Option<String>,
    pub keys: Option<String>,
    pub password: Option<String>,
}

impl UserFields {
    /// Fields for `POST /access/users`, including the initial password
    pub fn for_create(profile: &UserProfile) -> Self {
        Self {
            password: profile.password().map(str::to_string),
            ..Self::for_update(profile)
        }
    }

    /// Fields for `PUT /access/users/{userid}`; the password has its own endpoint
    pub fn for_update(profile: &UserProfile) -> Self {
        Self {
            comment: profile.comment.clone(),
            email: profile.email.clone(),
            enable: u8::from(profile.enable),
            expire: profile.expire,
            firstname: profile.firstname.clone(),
            lastname: profile.lastname.clone(),
            groups: profile.sanitized_groups().map(|groups| groups.join(",")),
            keys: profile.keys.clone(),
            password: None,
        }
    }

    /// Form-encoded pairs; unset fields are left out of the request
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("enable", self.enable.to_string()),
            ("expire", self.expire.to_string()),
        ];

        let optional = [
            ("comment", &self.comment),
            ("email", &self.email),
            ("firstname", &self.firstname),
            ("lastname", &self.lastname),
            ("groups", &self.groups),
            ("keys", &self.keys),
            ("password", &self.password),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }

        pairs
    }
}

impl fmt::Debug for UserFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFields")
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
