//! Proxmox VE access API
//!
//! [`ProxmoxApi`] is the capability the reconciler needs from the cluster;
//! [`PveClient`] implements it over HTTPS.

pub mod client;
pub mod error;
pub mod log;
pub mod types;

pub use client::PveClient;
pub use error::ApiError;
pub use log::ApiCallLogger;
pub use types::{UserFields, UserRecord};

use crate::user::UserId;

pub trait ProxmoxApi {
    /// `GET /access/users`
    fn list_users(&self) -> Result<Vec<UserRecord>, ApiError>;

    /// `POST /access/users`
    fn create_user(&self, userid: &UserId, fields: &UserFields) -> Result<(), ApiError>;

    /// `PUT /access/users/{userid}`
    fn update_user(&self, userid: &UserId, fields: &UserFields) -> Result<(), ApiError>;

    /// `DELETE /access/users/{userid}`
    fn delete_user(&self, userid: &UserId) -> Result<(), ApiError>;

    /// `PUT /access/password`
    fn set_password(&self, userid: &UserId, password: &str) -> Result<(), ApiError>;
}
