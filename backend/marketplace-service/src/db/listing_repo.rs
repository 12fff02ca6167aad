use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Listing, ListingCondition, ListingStatus};

/// Public browse filters. Hidden listings never appear here.
#[derive(Debug, Default)]
pub struct ListingFilter<'a> {
    pub search: Option<&'a str>,
    pub category: Option<&'a str>,
    pub condition: Option<ListingCondition>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: ListingSort,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingSort {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    Popular,
}

impl ListingSort {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("price_low") => ListingSort::PriceLow,
            Some("price_high") => ListingSort::PriceHigh,
            Some("popular") => ListingSort::Popular,
            _ => ListingSort::Newest,
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            ListingSort::Newest => "created_at DESC",
            ListingSort::PriceLow => "price ASC",
            ListingSort::PriceHigh => "price DESC",
            ListingSort::Popular => "views DESC, created_at DESC",
        }
    }
}

pub async fn browse(db: &PgPool, filter: &ListingFilter<'_>) -> Result<(Vec<Listing>, i64)> {
    let pattern = filter.search.map(|s| format!("%{}%", s));
    let where_clause = r#"
        WHERE is_hidden = FALSE
          AND status = 'available'
          AND ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::listing_condition IS NULL OR condition = $3)
          AND ($4::double precision IS NULL OR price >= $4)
          AND ($5::double precision IS NULL OR price <= $5)
    "#;

    let query = format!(
        "SELECT * FROM listings {} ORDER BY is_featured DESC, {} LIMIT $6 OFFSET $7",
        where_clause,
        filter.sort.order_clause()
    );

    let listings = sqlx::query_as::<_, Listing>(&query)
        .bind(pattern.as_deref())
        .bind(filter.category)
        .bind(filter.condition)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(db)
        .await?;

    let count_query = format!("SELECT COUNT(*) FROM listings {}", where_clause);
    let total: i64 = sqlx::query_scalar(&count_query)
        .bind(pattern.as_deref())
        .bind(filter.category)
        .bind(filter.condition)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_one(db)
        .await?;

    Ok((listings, total))
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Listing>> {
    let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(listing)
}

pub async fn increment_views(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE listings SET views = views + 1 WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    seller_id: Uuid,
    title: &str,
    description: &str,
    price: f64,
    category: &str,
    condition: ListingCondition,
    image_urls: &[String],
    flagged_reason: Option<&str>,
) -> Result<Listing> {
    let listing = sqlx::query_as::<_, Listing>(
        r#"
        INSERT INTO listings (
            seller_id, title, description, price, category, condition,
            image_url_1, image_url_2, image_url_3, flagged_reason
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(seller_id)
    .bind(title)
    .bind(description)
    .bind(price)
    .bind(category)
    .bind(condition)
    .bind(&image_urls[0])
    .bind(image_urls.get(1))
    .bind(image_urls.get(2))
    .bind(flagged_reason)
    .fetch_one(db)
    .await?;

    Ok(listing)
}

pub struct ListingUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<f64>,
    pub category: Option<&'a str>,
    pub condition: Option<ListingCondition>,
    pub status: Option<ListingStatus>,
    pub flagged_reason: Option<Option<&'a str>>,
}

pub async fn update(db: &PgPool, id: Uuid, changes: &ListingUpdate<'_>) -> Result<Listing> {
    let listing = sqlx::query_as::<_, Listing>(
        r#"
        UPDATE listings
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            category = COALESCE($5, category),
            condition = COALESCE($6, condition),
            status = COALESCE($7, status),
            flagged_reason = CASE WHEN $8 THEN $9 ELSE flagged_reason END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.price)
    .bind(changes.category)
    .bind(changes.condition)
    .bind(changes.status)
    .bind(changes.flagged_reason.is_some())
    .bind(changes.flagged_reason.flatten())
    .fetch_one(db)
    .await?;

    Ok(listing)
}

pub async fn replace_images(db: &PgPool, id: Uuid, image_urls: &[String]) -> Result<Listing> {
    let listing = sqlx::query_as::<_, Listing>(
        r#"
        UPDATE listings
        SET image_url_1 = $2, image_url_2 = $3, image_url_3 = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&image_urls[0])
    .bind(image_urls.get(1))
    .bind(image_urls.get(2))
    .fetch_one(db)
    .await?;

    Ok(listing)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM listings WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn list_by_seller(
    db: &PgPool,
    seller_id: Uuid,
    only_available: bool,
) -> Result<Vec<Listing>> {
    let listings = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE seller_id = $1
          AND is_hidden = FALSE
          AND (NOT $2 OR status = 'available')
        ORDER BY created_at DESC
        "#,
    )
    .bind(seller_id)
    .bind(only_available)
    .fetch_all(db)
    .await?;

    Ok(listings)
}

pub async fn set_hidden(
    db: &PgPool,
    id: Uuid,
    hidden: bool,
    reason: Option<&str>,
    admin_id: Uuid,
) -> Result<Listing> {
    let listing = sqlx::query_as::<_, Listing>(
        r#"
        UPDATE listings
        SET is_hidden = $2,
            hidden_reason = CASE WHEN $2 THEN $3 ELSE NULL END,
            hidden_at = CASE WHEN $2 THEN NOW() ELSE NULL END,
            hidden_by = CASE WHEN $2 THEN $4 ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(hidden)
    .bind(reason)
    .bind(admin_id)
    .fetch_one(db)
    .await?;

    Ok(listing)
}

pub async fn toggle_featured(db: &PgPool, id: Uuid) -> Result<Listing> {
    let listing = sqlx::query_as::<_, Listing>(
        "UPDATE listings SET is_featured = NOT is_featured, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(db)
    .await?;

    Ok(listing)
}

/// Admin view: includes hidden listings, filterable by status and flag.
pub async fn admin_list(
    db: &PgPool,
    status: Option<ListingStatus>,
    search: Option<&str>,
    flagged_only: bool,
    hidden_only: bool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Listing>, i64)> {
    let pattern = search.map(|s| format!("%{}%", s));
    let where_clause = r#"
        WHERE ($1::listing_status IS NULL OR status = $1)
          AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2)
          AND (NOT $3 OR flagged_reason IS NOT NULL)
          AND (NOT $4 OR is_hidden = TRUE)
    "#;

    let query = format!(
        "SELECT * FROM listings {} ORDER BY created_at DESC LIMIT $5 OFFSET $6",
        where_clause
    );
    let listings = sqlx::query_as::<_, Listing>(&query)
        .bind(status)
        .bind(pattern.as_deref())
        .bind(flagged_only)
        .bind(hidden_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

    let count_query = format!("SELECT COUNT(*) FROM listings {}", where_clause);
    let total: i64 = sqlx::query_scalar(&count_query)
        .bind(status)
        .bind(pattern.as_deref())
        .bind(flagged_only)
        .bind(hidden_only)
        .fetch_one(db)
        .await?;

    Ok((listings, total))
}
