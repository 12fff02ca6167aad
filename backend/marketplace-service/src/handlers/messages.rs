use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{listing_repo, message_repo, user_repo};
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::services::{conversations, moderation};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    // Omitted for listing-independent messages
    pub listing_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub listing_id: Option<Uuid>,
    pub listing_title: Option<String>,
    pub last_message: String,
    pub last_message_time: chrono::DateTime<chrono::Utc>,
    pub unread_count: i64,
}

/// GET /api/messages/conversations
pub async fn get_conversations(
    state: web::Data<AppState>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let messages = message_repo::list_for_user(&state.db, user_id.0).await?;
    let summaries = conversations::summarize(user_id.0, &messages);

    let mut response = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let other_user_name = user_repo::find_by_id(&state.db, summary.counterparty_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "Deleted user".to_string());
        let listing_title = match summary.listing_id {
            Some(listing_id) => Some(
                listing_repo::find_by_id(&state.db, listing_id)
                    .await?
                    .map(|l| l.title)
                    .unwrap_or_else(|| "Deleted listing".to_string()),
            ),
            None => None,
        };

        response.push(ConversationResponse {
            other_user_id: summary.counterparty_id,
            other_user_name,
            listing_id: summary.listing_id,
            listing_title,
            last_message: summary.last_message,
            last_message_time: summary.last_message_at,
            unread_count: summary.unread_count,
        });
    }

    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/messages/conversation/{other_user_id}/{listing_id}
///
/// Returns the thread and marks the viewer's unread messages read.
pub async fn get_conversation_messages(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (other_user_id, listing_id) = path.into_inner();

    let messages =
        message_repo::thread_and_mark_read(&state.db, user_id.0, other_user_id, Some(listing_id))
            .await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// GET /api/messages/conversation/{other_user_id}
///
/// The listing-independent thread with one other user.
pub async fn get_direct_conversation_messages(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let messages =
        message_repo::thread_and_mark_read(&state.db, user_id.0, path.into_inner(), None).await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/messages
pub async fn send_message(
    state: web::Data<AppState>,
    user_id: UserId,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let sender = super::require_member(&state, user_id.0).await?;

    let content = payload.content.trim();
    if content.is_empty() || content.len() > 2000 {
        return Err(AppError::Validation(
            "Message must be between 1 and 2000 characters".to_string(),
        ));
    }
    if payload.receiver_id == sender.id {
        return Err(AppError::Validation(
            "You cannot message yourself".to_string(),
        ));
    }

    if user_repo::find_by_id(&state.db, payload.receiver_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Receiver not found".to_string()));
    }
    if let Some(listing_id) = payload.listing_id {
        if listing_repo::find_by_id(&state.db, listing_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("Listing not found".to_string()));
        }
    }

    // Advisory only: flagged messages are still delivered
    let flagged_reason = moderation::should_auto_flag_message(content);

    let message = message_repo::create(
        &state.db,
        sender.id,
        payload.receiver_id,
        payload.listing_id,
        content,
        flagged_reason.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Created().json(message))
}

/// GET /api/messages/unread/count
pub async fn unread_count(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let count = message_repo::unread_count(&state.db, user_id.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "unread_count": count })))
}

/// PUT /api/messages/{id}/read
pub async fn mark_message_read(
    state: web::Data<AppState>,
    user_id: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let message = message_repo::find_by_id(&state.db, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    if message.receiver_id != user_id.0 {
        return Err(AppError::Authorization(
            "Only the receiver can mark a message read".to_string(),
        ));
    }

    message_repo::mark_read(&state.db, message.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "read" })))
}
