use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Report, ReportReason, ReportStatus, ReportType};

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    reporter_id: Uuid,
    report_type: ReportType,
    reported_user_id: Option<Uuid>,
    reported_listing_id: Option<Uuid>,
    reported_message_id: Option<Uuid>,
    reason: ReportReason,
    description: Option<&str>,
) -> Result<Report> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (
            reporter_id, report_type, reported_user_id, reported_listing_id,
            reported_message_id, reason, description
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(reporter_id)
    .bind(report_type)
    .bind(reported_user_id)
    .bind(reported_listing_id)
    .bind(reported_message_id)
    .bind(reason)
    .bind(description)
    .fetch_one(db)
    .await?;

    Ok(report)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Report>> {
    let report = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(report)
}

pub async fn list(
    db: &PgPool,
    status: Option<ReportStatus>,
    report_type: Option<ReportType>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Report>, i64)> {
    let reports = sqlx::query_as::<_, Report>(
        r#"
        SELECT * FROM reports
        WHERE ($1::report_status IS NULL OR status = $1)
          AND ($2::report_type IS NULL OR report_type = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(status)
    .bind(report_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM reports
        WHERE ($1::report_status IS NULL OR status = $1)
          AND ($2::report_type IS NULL OR report_type = $2)
        "#,
    )
    .bind(status)
    .bind(report_type)
    .fetch_one(db)
    .await?;

    Ok((reports, total))
}

/// Apply a reviewed transition. The caller has already validated it
/// against the permitted-transition table.
pub async fn apply_review(
    db: &PgPool,
    id: Uuid,
    status: ReportStatus,
    reviewed_by: Uuid,
    admin_notes: Option<&str>,
    action_taken: Option<&str>,
    resolved_at: Option<DateTime<Utc>>,
) -> Result<Report> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        UPDATE reports
        SET status = $2,
            reviewed_by = $3,
            admin_notes = $4,
            action_taken = $5,
            resolved_at = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(reviewed_by)
    .bind(admin_notes)
    .bind(action_taken)
    .bind(resolved_at)
    .fetch_one(db)
    .await?;

    Ok(report)
}

pub async fn count_against_user(db: &PgPool, user_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE reported_user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;

    Ok(count)
}
