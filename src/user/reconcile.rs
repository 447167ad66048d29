use thiserror::Error;

use super::models::{Action, DesiredState, Outcome, UserId, UserProfile};
use crate::api::{ApiError, ProxmoxApi, UserFields, UserRecord};
use crate::ui::prelude::{Level, emit};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Unable to retrieve users: {0}")]
    ListUsers(ApiError),

    #[error("Failed to update user with ID {userid}: {error}")]
    Update { userid: UserId, error: ApiError },

    #[error("Failed to update user password for user ID {userid}: {error}")]
    SetPassword { userid: UserId, error: ApiError },

    #[error("Failed to create user with ID {userid}: {error}")]
    Create { userid: UserId, error: ApiError },

    #[error("Failed to delete user with ID {userid}: {error}")]
    Delete { userid: UserId, error: ApiError },
}

/// Brings one user on the cluster in line with a desired state.
///
/// Stateless: the user list is fetched fresh on every call. Nothing guards
/// against the registry changing between the lookup and the mutation that
/// follows it; the remote API is trusted to reject conflicting writes.
pub struct UserReconciler<'a, A: ProxmoxApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: ProxmoxApi + ?Sized> UserReconciler<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Find a user by exact, case-sensitive ID
    pub fn lookup_user(&self, userid: &UserId) -> Result<Option<UserRecord>, ReconcileError> {
        let users = self.api.list_users().map_err(ReconcileError::ListUsers)?;
        let found = users.into_iter().find(|user| user.userid == userid.as_str());

        emit(
            Level::Debug,
            "user.lookup",
            &format!(
                "user {} in realm {} {}",
                userid.name(),
                userid.realm(),
                if found.is_some() { "exists" } else { "not found" }
            ),
            found.as_ref().and_then(|user| serde_json::to_value(user).ok()),
        );
        Ok(found)
    }

    pub fn reconcile(
        &self,
        userid: &UserId,
        profile: &UserProfile,
        state: DesiredState,
        dry_run: bool,
    ) -> Result<Outcome, ReconcileError> {
        match state {
            DesiredState::Present => self.ensure_present(userid, profile, dry_run),
            DesiredState::Absent => self.ensure_absent(userid, dry_run),
        }
    }

    fn ensure_present(
        &self,
        userid: &UserId,
        profile: &UserProfile,
        dry_run: bool,
    ) -> Result<Outcome, ReconcileError> {
        if self.lookup_user(userid)?.is_some() {
            if dry_run {
                return Ok(Outcome::new(
                    userid,
                    Action::WouldUpdate,
                    false,
                    format!("would update {userid} (check mode)"),
                ));
            }

            // Fields are not diffed, an existing user is always rewritten
            self.api
                .update_user(userid, &UserFields::for_update(profile))
                .map_err(|error| ReconcileError::Update {
                    userid: userid.clone(),
                    error,
                })?;

            // There is no way to tell whether the password differs, so a
            // given password is always pushed
            if let Some(password) = profile.password() {
                self.api
                    .set_password(userid, password)
                    .map_err(|error| ReconcileError::SetPassword {
                        userid: userid.clone(),
                        error,
                    })?;
            }

            return Ok(Outcome::new(
                userid,
                Action::Updated,
                true,
                format!("user {userid} updated"),
            ));
        }

        if dry_run {
            return Ok(Outcome::new(
                userid,
                Action::WouldCreate,
                true,
                format!("would update user {userid} (check mode)"),
            ));
        }

        self.api
            .create_user(userid, &UserFields::for_create(profile))
            .map_err(|error| ReconcileError::Create {
                userid: userid.clone(),
                error,
            })?;

        Ok(Outcome::new(
            userid,
            Action::Created,
            true,
            format!("created user {userid}"),
        ))
    }

    fn ensure_absent(&self, userid: &UserId, dry_run: bool) -> Result<Outcome, ReconcileError> {
        if self.lookup_user(userid)?.is_none() {
            return Ok(Outcome::new(
                userid,
                Action::NotFound,
                false,
                format!("user {userid} doesn't exist"),
            ));
        }

        if dry_run {
            return Ok(Outcome::new(
                userid,
                Action::WouldDelete,
                false,
                format!("would delete user {userid} (check mode)"),
            ));
        }

        self.api
            .delete_user(userid)
            .map_err(|error| ReconcileError::Delete {
                userid: userid.clone(),
                error,
            })?;

        Ok(Outcome::new(
            userid,
            Action::Deleted,
            true,
            format!("deleted user {userid}"),
        ))
    }
}
