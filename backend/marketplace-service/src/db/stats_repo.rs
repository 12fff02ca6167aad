use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::Result;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub banned_users: i64,
    pub total_listings: i64,
    pub active_listings: i64,
    pub total_messages: i64,
    pub pending_reports: i64,
    pub new_users_today: i64,
    pub new_listings_today: i64,
}

pub async fn dashboard_stats(db: &PgPool) -> Result<DashboardStats> {
    let row: (i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users),
            (SELECT COUNT(*) FROM users WHERE is_banned = TRUE),
            (SELECT COUNT(*) FROM listings),
            (SELECT COUNT(*) FROM listings WHERE status = 'available' AND is_hidden = FALSE),
            (SELECT COUNT(*) FROM messages),
            (SELECT COUNT(*) FROM reports WHERE status = 'pending'),
            (SELECT COUNT(*) FROM users WHERE created_at >= CURRENT_DATE),
            (SELECT COUNT(*) FROM listings WHERE created_at >= CURRENT_DATE)
        "#,
    )
    .fetch_one(db)
    .await?;

    Ok(DashboardStats {
        total_users: row.0,
        banned_users: row.1,
        total_listings: row.2,
        active_listings: row.3,
        total_messages: row.4,
        pending_reports: row.5,
        new_users_today: row.6,
        new_listings_today: row.7,
    })
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UserAnalytics {
    pub total_users: i64,
    pub new_users_30d: i64,
    pub banned_users: i64,
    pub signups_per_day: Vec<DayCount>,
}

pub async fn user_analytics(db: &PgPool) -> Result<UserAnalytics> {
    let totals: (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users),
            (SELECT COUNT(*) FROM users WHERE created_at >= NOW() - INTERVAL '30 days'),
            (SELECT COUNT(*) FROM users WHERE is_banned = TRUE)
        "#,
    )
    .fetch_one(db)
    .await?;

    let signups_per_day = sqlx::query_as::<_, DayCount>(
        r#"
        SELECT created_at::date AS day, COUNT(*) AS count
        FROM users
        WHERE created_at >= NOW() - INTERVAL '30 days'
        GROUP BY created_at::date
        ORDER BY day ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(UserAnalytics {
        total_users: totals.0,
        new_users_30d: totals.1,
        banned_users: totals.2,
        signups_per_day,
    })
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ListingAnalytics {
    pub total_listings: i64,
    pub available: i64,
    pub sold: i64,
    pub hidden: i64,
    pub flagged: i64,
    pub average_price: Option<f64>,
    pub by_category: Vec<CategoryCount>,
}

pub async fn listing_analytics(db: &PgPool) -> Result<ListingAnalytics> {
    let totals: (i64, i64, i64, i64, i64, Option<f64>) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status = 'available'),
            COUNT(*) FILTER (WHERE status = 'sold'),
            COUNT(*) FILTER (WHERE is_hidden = TRUE),
            COUNT(*) FILTER (WHERE flagged_reason IS NOT NULL),
            AVG(price)::double precision
        FROM listings
        "#,
    )
    .fetch_one(db)
    .await?;

    let by_category = sqlx::query_as::<_, CategoryCount>(
        r#"
        SELECT category, COUNT(*) AS count
        FROM listings
        GROUP BY category
        ORDER BY count DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(ListingAnalytics {
        total_listings: totals.0,
        available: totals.1,
        sold: totals.2,
        hidden: totals.3,
        flagged: totals.4,
        average_price: totals.5,
        by_category,
    })
}
