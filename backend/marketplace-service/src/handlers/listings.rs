use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::listing_repo::{self, ListingFilter, ListingSort, ListingUpdate};
use crate::db::{favorite_repo, user_repo};
use crate::error::{AppError, Result};
use crate::handlers::forms::{self, FormData};
use crate::middleware::{MaybeUserId, UserId};
use crate::models::{Listing, ListingCondition, ListingStatus};
use crate::services::moderation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub condition: Option<ListingCondition>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/listings
pub async fn browse(
    state: web::Data<AppState>,
    query: web::Query<BrowseQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);

    let filter = ListingFilter {
        search: query.q.as_deref(),
        category: query.category.as_deref(),
        condition: query.condition,
        min_price: query.min_price,
        max_price: query.max_price,
        sort: ListingSort::from_param(query.sort.as_deref()),
        limit,
        offset: (page - 1) * limit,
    };

    let (listings, total) = listing_repo::browse(&state.db, &filter).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "listings": listings,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

/// GET /api/listings/{id}
///
/// Anonymous callers see public listings only; hidden listings stay
/// visible to their owner and to admins. Each fetch counts a view.
pub async fn get_listing(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: MaybeUserId,
) -> Result<HttpResponse> {
    let listing = listing_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    if listing.is_hidden {
        let allowed = match viewer.0 {
            Some(viewer_id) => {
                viewer_id == listing.seller_id
                    || user_repo::find_by_id(&state.db, viewer_id)
                        .await?
                        .map(|u| u.role.is_admin())
                        .unwrap_or(false)
            }
            None => false,
        };
        if !allowed {
            return Err(AppError::NotFound("Listing not found".to_string()));
        }
    }

    listing_repo::increment_views(&state.db, listing.id).await?;

    Ok(HttpResponse::Ok().json(listing))
}

fn parse_condition(value: &str) -> Result<ListingCondition> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| AppError::Validation(format!("Unknown condition: {}", value)))
}

fn parse_status(value: &str) -> Result<ListingStatus> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| AppError::Validation(format!("Unknown status: {}", value)))
}

fn validate_listing_fields(title: &str, description: &str, price: f64) -> Result<()> {
    if title.len() < 3 || title.len() > 100 {
        return Err(AppError::Validation(
            "Title must be between 3 and 100 characters".to_string(),
        ));
    }
    if description.len() < 10 || description.len() > 2000 {
        return Err(AppError::Validation(
            "Description must be between 10 and 2000 characters".to_string(),
        ));
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation(
            "Price must be a positive number".to_string(),
        ));
    }
    Ok(())
}

async fn store_images(state: &AppState, form: &FormData) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for (_, image) in form.images.iter().take(3) {
        let url = state
            .images
            .store(image.bytes.clone(), "listings", image.extension)
            .await?;
        urls.push(url);
    }
    Ok(urls)
}

/// POST /api/listings
///
/// Multipart form: title, description, price, category, condition and
/// one to three image files.
pub async fn create_listing(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let seller = super::require_member(&state, user_id.0).await?;
    let form = forms::parse(payload, &state.config.uploads).await?;

    let title = form.required_text("title")?.trim().to_string();
    let description = form.required_text("description")?.trim().to_string();
    let price: f64 = form
        .required_text("price")?
        .parse()
        .map_err(|_| AppError::Validation("Price must be a number".to_string()))?;
    let category = form.required_text("category")?.to_string();
    let condition = parse_condition(form.required_text("condition")?)?;

    validate_listing_fields(&title, &description, price)?;

    if form.images.is_empty() {
        return Err(AppError::Validation(
            "At least one image is required".to_string(),
        ));
    }
    if form.images.len() > 3 {
        return Err(AppError::Validation("At most three images are allowed".to_string()));
    }

    // Advisory only: a flagged listing is still created
    let flagged_reason = moderation::should_auto_flag_listing(&title, &description, price);

    let image_urls = store_images(&state, &form).await?;

    let listing = listing_repo::create(
        &state.db,
        seller.id,
        &title,
        &description,
        price,
        &category,
        condition,
        &image_urls,
        flagged_reason.as_deref(),
    )
    .await?;

    if listing.flagged_reason.is_some() {
        tracing::info!(listing_id = %listing.id, "listing auto-flagged for review");
    }

    Ok(HttpResponse::Created().json(listing))
}

async fn owned_listing(state: &AppState, listing_id: Uuid, owner_id: Uuid) -> Result<Listing> {
    let listing = listing_repo::find_by_id(&state.db, listing_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    if listing.seller_id != owner_id {
        return Err(AppError::Authorization(
            "You can only modify your own listings".to_string(),
        ));
    }

    Ok(listing)
}

/// PUT /api/listings/{id}
pub async fn update_listing(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let caller = super::require_member(&state, user_id.0).await?;
    let listing = owned_listing(&state, path.into_inner(), caller.id).await?;

    let form = forms::parse(payload, &state.config.uploads).await?;

    let title = form.text("title").map(str::trim);
    let description = form.text("description").map(str::trim);
    let price = match form.text("price") {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| AppError::Validation("Price must be a number".to_string()))?,
        ),
        None => None,
    };

    validate_listing_fields(
        title.unwrap_or(&listing.title),
        description.unwrap_or(&listing.description),
        price.unwrap_or(listing.price),
    )?;

    let condition = match form.text("condition") {
        Some(raw) => Some(parse_condition(raw)?),
        None => None,
    };
    let status = match form.text("status") {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    // Re-run the heuristic over the post-update content
    let flagged = moderation::should_auto_flag_listing(
        title.unwrap_or(&listing.title),
        description.unwrap_or(&listing.description),
        price.unwrap_or(listing.price),
    );

    let updated = listing_repo::update(
        &state.db,
        listing.id,
        &ListingUpdate {
            title,
            description,
            price,
            category: form.text("category"),
            condition,
            status,
            flagged_reason: Some(flagged.as_deref()),
        },
    )
    .await?;

    let updated = if form.images.is_empty() {
        updated
    } else {
        if form.images.len() > 3 {
            return Err(AppError::Validation("At most three images are allowed".to_string()));
        }
        for old in [
            Some(listing.image_url_1.clone()),
            listing.image_url_2.clone(),
            listing.image_url_3.clone(),
        ]
        .into_iter()
        .flatten()
        {
            let _ = state.images.delete(&old).await;
        }
        let urls = store_images(&state, &form).await?;
        listing_repo::replace_images(&state.db, listing.id, &urls).await?
    };

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/listings/{id}
pub async fn delete_listing(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = super::require_member(&state, user_id.0).await?;
    let listing_id = path.into_inner();

    let listing = listing_repo::find_by_id(&state.db, listing_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    if listing.seller_id != caller.id && !caller.role.is_admin() {
        return Err(AppError::Authorization(
            "You can only delete your own listings".to_string(),
        ));
    }

    for url in [
        Some(listing.image_url_1.clone()),
        listing.image_url_2.clone(),
        listing.image_url_3.clone(),
    ]
    .into_iter()
    .flatten()
    {
        let _ = state.images.delete(&url).await;
    }

    listing_repo::delete(&state.db, listing.id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/listings/user/me
pub async fn my_listings(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let listings = listing_repo::list_by_seller(&state.db, user_id.0, false).await?;
    Ok(HttpResponse::Ok().json(listings))
}

/// POST /api/listings/{id}/favorite
pub async fn add_favorite(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let listing_id = path.into_inner();
    if listing_repo::find_by_id(&state.db, listing_id).await?.is_none() {
        return Err(AppError::NotFound("Listing not found".to_string()));
    }

    let favorite = favorite_repo::add(&state.db, user_id.0, listing_id).await?;
    Ok(HttpResponse::Ok().json(favorite))
}

/// DELETE /api/listings/{id}/favorite
pub async fn remove_favorite(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    favorite_repo::remove(&state.db, user_id.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/listings/favorites/me
pub async fn my_favorites(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let listings = favorite_repo::list_listings(&state.db, user_id.0).await?;
    Ok(HttpResponse::Ok().json(listings))
}
