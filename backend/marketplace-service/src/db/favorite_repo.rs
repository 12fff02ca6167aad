use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Favorite, Listing};

/// Idempotent: re-favoriting returns the existing row.
pub async fn add(db: &PgPool, user_id: Uuid, listing_id: Uuid) -> Result<Favorite> {
    let favorite = sqlx::query_as::<_, Favorite>(
        r#"
        INSERT INTO favorites (user_id, listing_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, listing_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(listing_id)
    .fetch_one(db)
    .await?;

    Ok(favorite)
}

/// Idempotent: removing an absent favorite is a no-op.
pub async fn remove(db: &PgPool, user_id: Uuid, listing_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND listing_id = $2")
        .bind(user_id)
        .bind(listing_id)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn list_listings(db: &PgPool, user_id: Uuid) -> Result<Vec<Listing>> {
    let listings = sqlx::query_as::<_, Listing>(
        r#"
        SELECT l.* FROM listings l
        JOIN favorites f ON f.listing_id = l.id
        WHERE f.user_id = $1 AND l.is_hidden = FALSE
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(listings)
}
