use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::handlers::users::UserResponse;
use crate::middleware::UserId;
use crate::models::User;
use crate::security::{jwt, password};
use crate::services::{authz, identity, oauth};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleAuthRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

fn issue_token(state: &AppState, user: &User) -> Result<TokenResponse> {
    let access_token =
        jwt::generate_access_token(user.id, state.config.jwt.access_ttl_minutes)?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserResponse::from(user.clone()),
    })
}

/// Deny login while a ban is active. An expired timed ban admits the
/// user; its stored fields are left for an explicit unban to clear.
pub(crate) fn check_login_ban(user: &User) -> Result<()> {
    if authz::ban_is_active(user, Utc::now()) {
        return Err(AppError::Authorization(match &user.ban_reason {
            Some(reason) => format!("Account is banned: {}", reason),
            None => "Account is banned".to_string(),
        }));
    }
    Ok(())
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    identity::validate_email_domain(
        &payload.email,
        &state.config.marketplace.allowed_email_domain,
    )?;

    let email = payload.email.to_lowercase();

    if user_repo::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let hashed = password::hash_password(&payload.password)?;
    let user = user_repo::create_user(&state.db, &email, payload.name.trim(), &hashed).await?;

    tracing::info!(user_id = %user.id, "new user registered");

    Ok(HttpResponse::Created().json(issue_token(&state, &user)?))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    // Unknown email and wrong password are indistinguishable to the caller
    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = user_repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.hashed_password.clone().ok_or_else(invalid)?;
    if !password::verify_password(&payload.password, &hash)? {
        return Err(invalid());
    }

    check_login_ban(&user)?;

    Ok(HttpResponse::Ok().json(issue_token(&state, &user)?))
}

/// POST /api/auth/google
///
/// Accepts a Google ID token assertion.
pub async fn google_login(
    state: web::Data<AppState>,
    payload: web::Json<GoogleAuthRequest>,
) -> Result<HttpResponse> {
    let profile =
        oauth::verify_google_token(&payload.token, &state.config.oauth.google_client_id).await?;

    google_sign_in(&state, profile).await
}

/// POST /api/auth/google-token
///
/// Accepts an OAuth access token instead of an ID token; the profile is
/// fetched from Google's userinfo endpoint.
pub async fn google_token_login(
    state: web::Data<AppState>,
    payload: web::Json<GoogleAuthRequest>,
) -> Result<HttpResponse> {
    let profile =
        oauth::verify_google_access_token(&payload.token, &state.config.oauth.google_client_id)
            .await?;

    google_sign_in(&state, profile).await
}

async fn google_sign_in(state: &AppState, profile: oauth::GoogleProfile) -> Result<HttpResponse> {
    let user = oauth::link_or_create_user(
        &state.db,
        &profile,
        &state.config.marketplace.allowed_email_domain,
    )
    .await?;

    check_login_ban(&user)?;

    Ok(HttpResponse::Ok().json(issue_token(state, &user)?))
}

/// GET /api/auth/me
pub async fn me(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let user = identity::resolve_user(&state.db, user_id.0).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn banned_user(banned_until: Option<chrono::DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "t@apsit.edu.in".to_string(),
            name: "Test".to_string(),
            phone: None,
            hashed_password: None,
            google_id: None,
            profile_picture: None,
            role: crate::models::UserRole::User,
            is_banned: true,
            ban_reason: Some("Spamming".to_string()),
            banned_at: Some(now - Duration::days(8)),
            banned_until,
            banned_by: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_ban_blocks_login_with_reason() {
        let user = banned_user(Some(Utc::now() + Duration::days(1)));
        let err = check_login_ban(&user).unwrap_err();
        assert!(err.to_string().contains("Spamming"));
    }

    #[test]
    fn test_indefinite_ban_blocks_login() {
        assert!(check_login_ban(&banned_user(None)).is_err());
    }

    #[test]
    fn test_expired_ban_admits_without_touching_stored_fields() {
        let user = banned_user(Some(Utc::now() - Duration::days(1)));
        assert!(check_login_ban(&user).is_ok());

        // The check never rewrites the row; an explicit unban still has
        // the full record to clear and audit.
        assert!(user.is_banned);
        assert_eq!(user.ban_reason.as_deref(), Some("Spamming"));
        assert!(user.banned_until.is_some());
        assert!(user.banned_by.is_some());
    }
}
