//! Admin moderation actions: user bans, role changes, listing
//! visibility and report review. Every mutation lands in the activity
//! log with the acting admin and their client address.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::{listing_repo, report_repo, user_repo};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{ListingStatus, ReportStatus, ReportType, UserRole};
use crate::services::{authz, moderation};
use crate::AppState;

// ============================================
// Users
// ============================================

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub reason: String,
    pub duration_days: Option<i64>,
}

/// PUT /api/admin/users/{id}/ban
///
/// With duration_days the ban expires on its own; without it the ban
/// holds until an admin lifts it. The target's listings are hidden in
/// the same transaction.
pub async fn ban_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: web::Json<BanRequest>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("Ban reason is required".to_string()));
    }

    let target = user_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    authz::can_ban(&admin, &target)?;

    let banned_until = match payload.duration_days {
        Some(days) if days > 0 => Some(Utc::now() + Duration::days(days)),
        Some(_) => {
            return Err(AppError::Validation(
                "Ban duration must be a positive number of days".to_string(),
            ))
        }
        None => None,
    };

    let (banned, hidden_listings) =
        user_repo::ban_user(&state.db, target.id, admin.id, reason, banned_until).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "ban_user",
        "user",
        banned.id,
        json!({
            "reason": reason,
            "banned_until": banned_until,
            "hidden_listings": hidden_listings,
        }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "banned",
        "user_id": banned.id,
        "banned_until": banned.banned_until,
        "hidden_listings": hidden_listings,
    })))
}

/// PUT /api/admin/users/{id}/unban
pub async fn unban_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let target = user_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !target.is_banned {
        return Err(AppError::Validation("User is not banned".to_string()));
    }

    let user = user_repo::unban_user(&state.db, target.id).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "unban_user",
        "user",
        user.id,
        json!({}),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "unbanned", "user_id": user.id })))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let admin = super::require_super_admin(&state, user_id.0).await?;

    let target = user_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    authz::can_delete_user(&admin, &target)?;

    user_repo::delete_user(&state.db, target.id).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "delete_user",
        "user",
        target.id,
        json!({ "email": target.email }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

/// PUT /api/admin/users/{id}/role
pub async fn change_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: web::Json<ChangeRoleRequest>,
) -> Result<HttpResponse> {
    let admin = super::require_super_admin(&state, user_id.0).await?;

    let target = user_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    authz::can_change_role(&admin, &target)?;

    if payload.role == UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Cannot promote to super admin".to_string(),
        ));
    }

    let user = user_repo::change_role(&state.db, target.id, payload.role).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "change_role",
        "user",
        user.id,
        json!({ "from": target.role.as_str(), "to": user.role.as_str() }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "updated", "role": user.role })))
}

// ============================================
// Listings
// ============================================

#[derive(Debug, Deserialize)]
pub struct AdminListingQuery {
    pub status: Option<ListingStatus>,
    pub search: Option<String>,
    pub flagged: Option<bool>,
    pub hidden: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/admin/listings
pub async fn list_listings(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<AdminListingQuery>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;

    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);

    let (listings, total) = listing_repo::admin_list(
        &state.db,
        query.status,
        query.search.as_deref(),
        query.flagged.unwrap_or(false),
        query.hidden.unwrap_or(false),
        limit,
        (page - 1) * limit,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "listings": listings,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HideListingRequest {
    pub reason: Option<String>,
}

/// PUT /api/admin/listings/{id}/hide
pub async fn hide_listing(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: web::Json<HideListingRequest>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let listing = listing_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("Policy violation");

    let hidden = listing_repo::set_hidden(&state.db, listing.id, true, Some(reason), admin.id)
        .await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "hide_listing",
        "listing",
        hidden.id,
        json!({ "reason": reason }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(hidden))
}

/// PUT /api/admin/listings/{id}/show
pub async fn show_listing(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let listing = listing_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    let shown = listing_repo::set_hidden(&state.db, listing.id, false, None, admin.id).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "show_listing",
        "listing",
        shown.id,
        json!({}),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(shown))
}

/// DELETE /api/admin/listings/{id}
pub async fn delete_listing(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let listing = listing_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    for url in [
        Some(listing.image_url_1.clone()),
        listing.image_url_2.clone(),
        listing.image_url_3.clone(),
    ]
    .into_iter()
    .flatten()
    {
        let _ = state.images.delete(&url).await;
    }

    listing_repo::delete(&state.db, listing.id).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "delete_listing",
        "listing",
        listing.id,
        json!({ "title": listing.title, "seller_id": listing.seller_id }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

/// PUT /api/admin/listings/{id}/feature
pub async fn toggle_feature(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let listing = listing_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    let updated = listing_repo::toggle_featured(&state.db, listing.id).await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "toggle_feature",
        "listing",
        updated.id,
        json!({ "is_featured": updated.is_featured }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

// ============================================
// Reports
// ============================================

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
    pub report_type: Option<ReportType>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/admin/reports
pub async fn list_reports(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<ReportListQuery>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;

    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);

    let (reports, total) = report_repo::list(
        &state.db,
        query.status,
        query.report_type,
        limit,
        (page - 1) * limit,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "reports": reports,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

/// GET /api/admin/reports/{id}
pub async fn report_detail(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    super::require_admin(&state, user_id.0).await?;

    let report = report_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    Ok(HttpResponse::Ok().json(report))
}

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub action_taken: Option<String>,
}

/// PUT /api/admin/reports/{id}/review
///
/// Moves a report through its lifecycle. Terminal states are final;
/// the permitted transitions are checked before anything is written.
pub async fn review_report(
    state: web::Data<AppState>,
    req: HttpRequest,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: web::Json<ReviewReportRequest>,
) -> Result<HttpResponse> {
    let admin = super::require_admin(&state, user_id.0).await?;

    let report = report_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    moderation::check_transition(report.status, payload.status)?;

    let now = Utc::now();
    let updated = report_repo::apply_review(
        &state.db,
        report.id,
        payload.status,
        admin.id,
        payload.admin_notes.as_deref(),
        payload.action_taken.as_deref(),
        moderation::resolution_timestamp(payload.status, now),
    )
    .await?;

    moderation::log_admin_activity(
        &state.db,
        admin.id,
        "review_report",
        "report",
        updated.id,
        json!({
            "from": report.status.as_str(),
            "to": updated.status.as_str(),
            "action_taken": payload.action_taken,
        }),
        moderation::client_ip(&req),
    )
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}
