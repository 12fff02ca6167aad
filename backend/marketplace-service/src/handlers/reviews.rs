use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{listing_repo, review_repo, user_repo};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub reviewed_user_id: Uuid,
    pub listing_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// POST /api/reviews
pub async fn create_review(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse> {
    let reviewer = super::require_member(&state, user_id.0).await?;

    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    if payload.reviewed_user_id == reviewer.id {
        return Err(AppError::Validation(
            "You cannot review yourself".to_string(),
        ));
    }

    if user_repo::find_by_id(&state.db, payload.reviewed_user_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let listing = listing_repo::find_by_id(&state.db, payload.listing_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

    if listing.seller_id != payload.reviewed_user_id {
        return Err(AppError::Validation(
            "Listing does not belong to the reviewed user".to_string(),
        ));
    }

    // The unique constraint turns a duplicate into a Conflict
    let review = review_repo::create(
        &state.db,
        reviewer.id,
        payload.reviewed_user_id,
        payload.listing_id,
        payload.rating,
        payload.comment.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(review))
}

/// GET /api/reviews/listing/{id}
pub async fn get_listing_reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let reviews = review_repo::list_for_listing(&state.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// GET /api/reviews/my-reviews
pub async fn my_received_reviews(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let reviews = review_repo::list_received(&state.db, user_id.0).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// GET /api/reviews/given
pub async fn my_given_reviews(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let reviews = review_repo::list_given(&state.db, user_id.0).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// DELETE /api/reviews/{id}
pub async fn delete_review(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let review = review_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    if review.reviewer_id != user_id.0 {
        return Err(AppError::Authorization(
            "You can only delete your own reviews".to_string(),
        ));
    }

    review_repo::delete(&state.db, review.id).await?;

    Ok(HttpResponse::NoContent().finish())
}
