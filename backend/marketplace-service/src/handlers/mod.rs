pub mod admin;
pub mod auth;
pub mod forms;
pub mod health;
pub mod listings;
pub mod messages;
pub mod moderation;
pub mod reports;
pub mod reviews;
pub mod users;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::User;
use crate::services::{authz, identity};
use crate::AppState;

/// Resolve the caller and run the admin gate.
pub(crate) async fn require_admin(state: &AppState, user_id: Uuid) -> Result<User> {
    let user = identity::resolve_user(&state.db, user_id).await?;
    authz::authorize(&user, authz::AccessLevel::Admin, Utc::now())?;
    Ok(user)
}

pub(crate) async fn require_super_admin(state: &AppState, user_id: Uuid) -> Result<User> {
    let user = identity::resolve_user(&state.db, user_id).await?;
    authz::authorize(&user, authz::AccessLevel::SuperAdmin, Utc::now())?;
    Ok(user)
}

/// Resolve the caller and enforce that any active ban denies access.
pub(crate) async fn require_member(state: &AppState, user_id: Uuid) -> Result<User> {
    let user = identity::resolve_user(&state.db, user_id).await?;
    authz::authorize(&user, authz::AccessLevel::Authenticated, Utc::now())?;
    Ok(user)
}

