use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Review;

pub async fn create(
    db: &PgPool,
    reviewer_id: Uuid,
    reviewed_user_id: Uuid,
    listing_id: Uuid,
    rating: i32,
    comment: Option<&str>,
) -> Result<Review> {
    // unique(reviewer_id, reviewed_user_id, listing_id) surfaces as Conflict
    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (reviewer_id, reviewed_user_id, listing_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(reviewer_id)
    .bind(reviewed_user_id)
    .bind(listing_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(db)
    .await?;

    Ok(review)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(review)
}

pub async fn list_for_listing(db: &PgPool, listing_id: Uuid) -> Result<Vec<Review>> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE listing_id = $1 ORDER BY created_at DESC",
    )
    .bind(listing_id)
    .fetch_all(db)
    .await?;

    Ok(reviews)
}

pub async fn list_received(db: &PgPool, user_id: Uuid) -> Result<Vec<Review>> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE reviewed_user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(reviews)
}

pub async fn list_given(db: &PgPool, user_id: Uuid) -> Result<Vec<Review>> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE reviewer_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(reviews)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

pub async fn rating_summary(db: &PgPool, user_id: Uuid) -> Result<RatingSummary> {
    let row: (Option<f64>, i64) = sqlx::query_as(
        "SELECT AVG(rating)::double precision, COUNT(*) FROM reviews WHERE reviewed_user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(RatingSummary {
        average: row.0,
        count: row.1,
    })
}
