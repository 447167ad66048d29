//! User reconciliation
//!
//! Looks a user up on the cluster and creates, updates or deletes it so the
//! registry matches the requested state.

mod models;
mod reconcile;

pub use models::{DesiredState, Outcome, UserId, UserProfile};
pub use reconcile::UserReconciler;
