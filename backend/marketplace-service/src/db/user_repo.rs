use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{User, UserRole};

pub async fn create_user(
    db: &PgPool,
    email: &str,
    name: &str,
    hashed_password: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, hashed_password)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(hashed_password)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn create_google_user(
    db: &PgPool,
    email: &str,
    name: &str,
    google_id: &str,
    profile_picture: Option<&str>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, google_id, profile_picture)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(google_id)
    .bind(profile_picture)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn link_google_identity(
    db: &PgPool,
    id: Uuid,
    google_id: Option<String>,
    profile_picture: Option<String>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET google_id = $2, profile_picture = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(google_id)
    .bind(profile_picture)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn update_password(db: &PgPool, id: Uuid, hashed_password: &str) -> Result<()> {
    sqlx::query("UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(hashed_password)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn update_profile_picture(db: &PgPool, id: Uuid, url: &str) -> Result<()> {
    sqlx::query("UPDATE users SET profile_picture = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(url)
        .execute(db)
        .await?;

    Ok(())
}

/// Ban a user and hide their active listings in one transaction, so a
/// crash can never leave a banned seller with live listings.
pub async fn ban_user(
    db: &PgPool,
    id: Uuid,
    banned_by: Uuid,
    reason: &str,
    banned_until: Option<DateTime<Utc>>,
) -> Result<(User, u64)> {
    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET is_banned = TRUE,
            ban_reason = $2,
            banned_at = NOW(),
            banned_until = $3,
            banned_by = $4,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(reason)
    .bind(banned_until)
    .bind(banned_by)
    .fetch_one(&mut *tx)
    .await?;

    let hidden = sqlx::query(
        r#"
        UPDATE listings
        SET is_hidden = TRUE,
            hidden_reason = 'Seller banned',
            hidden_at = NOW(),
            hidden_by = $2,
            updated_at = NOW()
        WHERE seller_id = $1 AND is_hidden = FALSE
        "#,
    )
    .bind(id)
    .bind(banned_by)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    Ok((user, hidden))
}

pub async fn unban_user(db: &PgPool, id: Uuid) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET is_banned = FALSE,
            ban_reason = NULL,
            banned_at = NULL,
            banned_until = NULL,
            banned_by = NULL,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn delete_user(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn change_role(db: &PgPool, id: Uuid, role: UserRole) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(role)
    .fetch_one(db)
    .await?;

    Ok(user)
}

/// Admin user listing with optional text search, role and ban filters.
pub async fn list_users(
    db: &PgPool,
    search: Option<&str>,
    role: Option<UserRole>,
    banned: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64)> {
    let pattern = search.map(|s| format!("%{}%", s));

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE ($1::text IS NULL OR email ILIKE $1 OR name ILIKE $1)
          AND ($2::user_role IS NULL OR role = $2)
          AND ($3::boolean IS NULL OR is_banned = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(pattern.as_deref())
    .bind(role)
    .bind(banned)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::text IS NULL OR email ILIKE $1 OR name ILIKE $1)
          AND ($2::user_role IS NULL OR role = $2)
          AND ($3::boolean IS NULL OR is_banned = $3)
        "#,
    )
    .bind(pattern.as_deref())
    .bind(role)
    .bind(banned)
    .fetch_one(db)
    .await?;

    Ok((users, total))
}
