use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::{listing_repo, review_repo, user_repo};
use crate::error::{AppError, Result};
use crate::handlers::forms;
use crate::middleware::UserId;
use crate::models::{User, UserRole};
use crate::security::password;
use crate::services::identity;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            profile_picture: user.profile_picture,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub listing_count: i64,
    pub sold_count: i64,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
}

async fn profile_for(state: &AppState, user: User, public_only: bool) -> Result<ProfileResponse> {
    let listings = listing_repo::list_by_seller(&state.db, user.id, public_only).await?;
    let sold_count = listing_repo::list_by_seller(&state.db, user.id, false)
        .await?
        .iter()
        .filter(|l| l.status == crate::models::ListingStatus::Sold)
        .count() as i64;
    let ratings = review_repo::rating_summary(&state.db, user.id).await?;

    Ok(ProfileResponse {
        user: UserResponse::from(user),
        listing_count: listings.len() as i64,
        sold_count,
        avg_rating: ratings.average.map(|a| (a * 10.0).round() / 10.0),
        review_count: ratings.count,
    })
}

/// GET /api/users/me
pub async fn get_my_profile(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let user = identity::resolve_user(&state.db, user_id.0).await?;
    let profile = profile_for(&state, user, false).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/users/{id}
pub async fn get_user_profile(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = user_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let profile = profile_for(&state, user, true).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /api/users/me
///
/// Multipart form: optional name, phone, password change
/// (current_password + new_password) and a profile_picture file.
pub async fn update_profile(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = identity::resolve_user(&state.db, user_id.0).await?;
    let form = forms::parse(payload, &state.config.uploads).await?;

    if let Some(new_password) = form.text("new_password").filter(|p| !p.is_empty()) {
        if new_password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        let current = form.text("current_password").unwrap_or_default();
        if current.is_empty() {
            return Err(AppError::BadRequest(
                "Current password is required to set a new password".to_string(),
            ));
        }
        let hash = user.hashed_password.clone().ok_or_else(|| {
            AppError::BadRequest("Cannot set password for Google-only account".to_string())
        })?;
        if !password::verify_password(current, &hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }
        let new_hash = password::hash_password(new_password)?;
        user_repo::update_password(&state.db, user.id, &new_hash).await?;
    }

    let mut updated =
        user_repo::update_profile(&state.db, user.id, form.text("name"), form.text("phone"))
            .await?;

    if let Some((_, image)) = form.images.iter().find(|(name, _)| name == "profile_picture") {
        // Google avatars live on Google's CDN and are never ours to delete
        if let Some(old) = &updated.profile_picture {
            if !old.contains("googleusercontent") {
                let _ = state.images.delete(old).await;
            }
        }
        let url = state
            .images
            .store(image.bytes.clone(), "profiles", image.extension)
            .await?;
        user_repo::update_profile_picture(&state.db, updated.id, &url).await?;
        updated.profile_picture = Some(url);
    }

    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// GET /api/users/{id}/listings
pub async fn get_user_listings(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    if user_repo::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let listings = listing_repo::list_by_seller(&state.db, user_id, true).await?;
    Ok(HttpResponse::Ok().json(listings))
}

/// GET /api/users/{id}/reviews
pub async fn get_user_reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    if user_repo::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let reviews = review_repo::list_received(&state.db, user_id).await?;
    Ok(HttpResponse::Ok().json(reviews))
}
