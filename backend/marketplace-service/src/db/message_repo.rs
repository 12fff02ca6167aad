use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Message;

pub async fn create(
    db: &PgPool,
    sender_id: Uuid,
    receiver_id: Uuid,
    listing_id: Option<Uuid>,
    content: &str,
    flagged_reason: Option<&str>,
) -> Result<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (sender_id, receiver_id, listing_id, content, flagged_reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(sender_id)
    .bind(receiver_id)
    .bind(listing_id)
    .bind(content)
    .bind(flagged_reason)
    .fetch_one(db)
    .await?;

    Ok(message)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Message>> {
    let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(message)
}

/// Every message the user sent or received, for conversation grouping.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE sender_id = $1 OR receiver_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(messages)
}

/// Fetch a two-party thread for one conversation and mark the viewer's
/// unread messages read in the same transaction, so the unread badge and
/// the returned thread can never disagree. A `None` listing selects the
/// listing-independent thread, hence IS NOT DISTINCT FROM.
pub async fn thread_and_mark_read(
    db: &PgPool,
    viewer_id: Uuid,
    other_user_id: Uuid,
    listing_id: Option<Uuid>,
) -> Result<Vec<Message>> {
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        UPDATE messages
        SET is_read = TRUE
        WHERE receiver_id = $1 AND sender_id = $2
          AND listing_id IS NOT DISTINCT FROM $3
          AND is_read = FALSE
        "#,
    )
    .bind(viewer_id)
    .bind(other_user_id)
    .bind(listing_id)
    .execute(&mut *tx)
    .await?;

    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE listing_id IS NOT DISTINCT FROM $3
          AND ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
        ORDER BY created_at ASC
        "#,
    )
    .bind(viewer_id)
    .bind(other_user_id)
    .bind(listing_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(messages)
}

pub async fn unread_count(db: &PgPool, user_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(count)
}

pub async fn mark_read(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}
