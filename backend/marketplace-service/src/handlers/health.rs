use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::Result;
use crate::AppState;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    Ok(HttpResponse::Ok().json(json!({
        "status": if db_ok { "healthy" } else { "degraded" },
        "database": db_ok,
    })))
}
