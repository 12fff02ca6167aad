use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Category;

pub async fn list(db: &PgPool, include_inactive: bool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT * FROM categories
        WHERE $1 OR is_active = TRUE
        ORDER BY display_order ASC, name ASC
        "#,
    )
    .bind(include_inactive)
    .fetch_all(db)
    .await?;

    Ok(categories)
}

pub async fn create(
    db: &PgPool,
    name: &str,
    slug: &str,
    icon: Option<&str>,
    display_order: i32,
) -> Result<Category> {
    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, slug, icon, display_order)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(icon)
    .bind(display_order)
    .fetch_one(db)
    .await?;

    Ok(category)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(category)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn listings_in_category(db: &PgPool, name: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE category = $1")
        .bind(name)
        .fetch_one(db)
        .await?;

    Ok(count)
}
