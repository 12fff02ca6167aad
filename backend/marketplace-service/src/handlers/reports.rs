use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{listing_repo, message_repo, report_repo, user_repo};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{ReportReason, ReportType};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub report_type: ReportType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

/// POST /api/reports
///
/// File a report against a user, listing or message. The target must
/// exist and match the declared type.
pub async fn create_report(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<CreateReportRequest>,
) -> Result<HttpResponse> {
    let reporter = super::require_member(&state, user_id.0).await?;

    let (reported_user, reported_listing, reported_message) = match payload.report_type {
        ReportType::User => {
            let user = user_repo::find_by_id(&state.db, payload.target_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reported user not found".to_string()))?;
            if user.id == reporter.id {
                return Err(AppError::Validation(
                    "You cannot report yourself".to_string(),
                ));
            }
            (Some(user.id), None, None)
        }
        ReportType::Listing => {
            let listing = listing_repo::find_by_id(&state.db, payload.target_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reported listing not found".to_string()))?;
            (Some(listing.seller_id), Some(listing.id), None)
        }
        ReportType::Message => {
            let message = message_repo::find_by_id(&state.db, payload.target_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Reported message not found".to_string()))?;
            if message.sender_id != reporter.id && message.receiver_id != reporter.id {
                return Err(AppError::Authorization(
                    "You can only report messages from your own conversations".to_string(),
                ));
            }
            (Some(message.sender_id), None, Some(message.id))
        }
    };

    let report = report_repo::create(
        &state.db,
        reporter.id,
        payload.report_type,
        reported_user,
        reported_listing,
        reported_message,
        payload.reason,
        payload.description.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(report))
}
