//! Admin console: login, dashboard, user directory, analytics,
//! categories and the activity log. Mutating endpoints append to the
//! activity log after their change commits.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::db::{
    activity_log_repo, category_repo, listing_repo, report_repo, review_repo, stats_repo,
    user_repo,
};
use crate::error::{AppError, Result};
use crate::handlers::users::UserResponse;
use crate::middleware::UserId;
use crate::models::{User, UserRole};
use crate::security::{jwt, password};
use crate::services::moderation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/admin/login
///
/// Same credential check as the member login, but only admin accounts
/// get a token out of it.
pub async fn admin_login(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<AdminLoginRequest>,
) -> Result<HttpResponse> {
    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = user_repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.hashed_password.clone().ok_or_else(invalid)?;
    if !password::verify_password(&payload.password, &hash)? {
        return Err(invalid());
    }

    if !user.role.is_admin() {
        return Err(AppError::Authorization("Admin access required".to_string()));
    }
    super::auth::check_login_ban(&user)?;

    let access_token = jwt::generate_access_token(user.id, state.config.jwt.access_ttl_minutes)?;

    moderation::log_admin_activity(
        &state.db,
        user.id,
        "admin_login",
        "user",
        user.id,
        json!({}),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "user": UserResponse::from(user),
    })))
}

/// GET /api/admin/verify
pub async fn verify_admin(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "user": UserResponse::from(admin),
    })))
}

/// GET /api/admin/dashboard/stats
pub async fn dashboard_stats(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;
    let stats = stats_repo::dashboard_stats(&state.db).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Debug, Deserialize)]
pub struct RecentActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/dashboard/activity
pub async fn recent_activity(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<RecentActivityQuery>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let entries = activity_log_repo::recent(&state.db, limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub banned: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserRow {
    #[serde(flatten)]
    pub user: UserResponse,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_until: Option<chrono::DateTime<chrono::Utc>>,
}

fn admin_row(user: User) -> AdminUserRow {
    AdminUserRow {
        is_banned: user.is_banned,
        ban_reason: user.ban_reason.clone(),
        banned_until: user.banned_until,
        user: UserResponse::from(user),
    }
}

/// GET /api/admin/users
pub async fn list_users(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;

    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);

    let (users, total) = user_repo::list_users(
        &state.db,
        query.search.as_deref(),
        query.role,
        query.banned,
        limit,
        (page - 1) * limit,
    )
    .await?;

    let rows: Vec<AdminUserRow> = users.into_iter().map(admin_row).collect();

    Ok(HttpResponse::Ok().json(json!({
        "users": rows,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

/// GET /api/admin/users/{id}
pub async fn user_detail(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;

    let target = user_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let listings = listing_repo::list_by_seller(&state.db, target.id, false).await?;
    let ratings = review_repo::rating_summary(&state.db, target.id).await?;
    let reports_against = report_repo::count_against_user(&state.db, target.id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": admin_row(target),
        "listing_count": listings.len(),
        "review_count": ratings.count,
        "avg_rating": ratings.average,
        "reports_against": reports_against,
    })))
}

/// GET /api/admin/analytics/users
pub async fn user_analytics(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;
    let analytics = stats_repo::user_analytics(&state.db).await?;
    Ok(HttpResponse::Ok().json(analytics))
}

/// GET /api/admin/analytics/listings
pub async fn listing_analytics(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;
    let analytics = stats_repo::listing_analytics(&state.db).await?;
    Ok(HttpResponse::Ok().json(analytics))
}

/// GET /api/admin/categories (public: the storefront needs it too)
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse> {
    let categories = category_repo::list(&state.db, false).await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub icon: Option<String>,
    pub display_order: Option<i32>,
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// POST /api/admin/categories
pub async fn create_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    payload: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let name = payload.name.trim();
    if name.is_empty() || name.len() > 50 {
        return Err(AppError::Validation(
            "Category name must be between 1 and 50 characters".to_string(),
        ));
    }

    let category = category_repo::create(
        &state.db,
        name,
        &slugify(name),
        payload.icon.as_deref(),
        payload.display_order.unwrap_or(0),
    )
    .await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "create_category",
        "category",
        category.id,
        json!({ "name": category.name }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Created().json(category))
}

/// DELETE /api/admin/categories/{id}
pub async fn delete_category(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let category = category_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    let in_use = category_repo::listings_in_category(&state.db, &category.name).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category still has {} listings",
            in_use
        )));
    }

    category_repo::delete(&state.db, category.id).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "delete_category",
        "category",
        category.id,
        json!({ "name": category.name }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct ActivityLogQuery {
    pub action: Option<String>,
    pub admin_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/admin/activity-log
pub async fn activity_log(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<ActivityLogQuery>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let page = query.page.unwrap_or(1).max(1);

    let (entries, total) = activity_log_repo::list(
        &state.db,
        query.action.as_deref(),
        query.admin_id,
        limit,
        (page - 1) * limit,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "entries": entries,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Lab Equipment"), "lab-equipment");
        assert_eq!(slugify("  Books &  Notes "), "books-notes");
        assert_eq!(slugify("Cycles"), "cycles");
    }
}
