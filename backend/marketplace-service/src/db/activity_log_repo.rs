use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::AdminActivityLog;

pub async fn insert(
    db: &PgPool,
    admin_id: Uuid,
    action: &str,
    target_type: &str,
    target_id: Uuid,
    details: serde_json::Value,
    ip_address: Option<String>,
) -> Result<AdminActivityLog> {
    let entry = sqlx::query_as::<_, AdminActivityLog>(
        r#"
        INSERT INTO admin_activity_log (admin_id, action, target_type, target_id, details, ip_address)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(admin_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details)
    .bind(ip_address)
    .fetch_one(db)
    .await?;

    Ok(entry)
}

pub async fn list(
    db: &PgPool,
    action: Option<&str>,
    admin_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<AdminActivityLog>, i64)> {
    let entries = sqlx::query_as::<_, AdminActivityLog>(
        r#"
        SELECT * FROM admin_activity_log
        WHERE ($1::text IS NULL OR action = $1)
          AND ($2::uuid IS NULL OR admin_id = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(action)
    .bind(admin_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM admin_activity_log
        WHERE ($1::text IS NULL OR action = $1)
          AND ($2::uuid IS NULL OR admin_id = $2)
        "#,
    )
    .bind(action)
    .bind(admin_id)
    .fetch_one(db)
    .await?;

    Ok((entries, total))
}

pub async fn recent(db: &PgPool, limit: i64) -> Result<Vec<AdminActivityLog>> {
    let entries = sqlx::query_as::<_, AdminActivityLog>(
        "SELECT * FROM admin_activity_log ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(entries)
}
