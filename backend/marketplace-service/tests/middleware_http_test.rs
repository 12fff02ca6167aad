//! HTTP-level tests for the auth and rate-limit middleware. These run
//! against a minimal in-process app and need no database.

use std::sync::Arc;

use actix_web::dev::ServiceResponse;
use actix_web::{http::StatusCode, test, web, App, HttpResponse};
use uuid::Uuid;

use marketplace_service::config::RateLimitSettings;
use marketplace_service::middleware::{
    JwtAuthMiddleware, MaybeUserId, RateLimitMiddleware, RateLimiter, UserId,
};
use marketplace_service::security::jwt;

async fn whoami(user_id: UserId) -> HttpResponse {
    HttpResponse::Ok().body(user_id.0.to_string())
}

async fn maybe_whoami(viewer: MaybeUserId) -> HttpResponse {
    match viewer.0 {
        Some(id) => HttpResponse::Ok().body(id.to_string()),
        None => HttpResponse::Ok().body("anonymous"),
    }
}

/// Middleware denials surface as service errors in tests, so collapse
/// both shapes down to a status code.
fn response_status<B>(result: Result<ServiceResponse<B>, actix_web::Error>) -> StatusCode {
    match result {
        Ok(res) => res.status(),
        Err(err) => err.error_response().status(),
    }
}

#[actix_web::test]
async fn jwt_middleware_rejects_missing_and_bad_tokens() {
    jwt::initialize_keys("http-test-secret");

    let app = test::init_service(
        App::new().service(
            web::scope("/private")
                .wrap(JwtAuthMiddleware)
                .route("/me", web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get().uri("/private/me").to_request();
    let res = test::try_call_service(&app, req).await;
    assert_eq!(response_status(res), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/private/me")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let res = test::try_call_service(&app, req).await;
    assert_eq!(response_status(res), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/private/me")
        .insert_header(("Authorization", "Basic abc"))
        .to_request();
    let res = test::try_call_service(&app, req).await;
    assert_eq!(response_status(res), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn jwt_middleware_passes_identity_through() {
    jwt::initialize_keys("http-test-secret");
    let id = Uuid::new_v4();
    let token = jwt::generate_access_token(id, 5).unwrap();

    let app = test::init_service(
        App::new().service(
            web::scope("/private")
                .wrap(JwtAuthMiddleware)
                .route("/me", web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/private/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = test::read_body(res).await;
    assert_eq!(body, id.to_string().as_bytes());
}

#[actix_web::test]
async fn user_id_extractor_works_without_middleware() {
    jwt::initialize_keys("http-test-secret");
    let id = Uuid::new_v4();
    let token = jwt::generate_access_token(id, 5).unwrap();

    let app =
        test::init_service(App::new().route("/bare", web::get().to(whoami))).await;

    let req = test::TestRequest::get()
        .uri("/bare")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/bare").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn optional_identity_is_asymmetric() {
    jwt::initialize_keys("http-test-secret");

    let app =
        test::init_service(App::new().route("/public", web::get().to(maybe_whoami))).await;

    // No header at all: anonymous access
    let req = test::TestRequest::get().uri("/public").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(test::read_body(res).await, "anonymous".as_bytes());

    // A header that is present but invalid is still rejected
    let req = test::TestRequest::get()
        .uri("/public")
        .insert_header(("Authorization", "Bearer garbage"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn rate_limiter_returns_429_with_retry_after() {
    let limiter = Arc::new(RateLimiter::in_memory(&RateLimitSettings {
        max_requests: 3,
        window_secs: 60,
    }));

    let app = test::init_service(
        App::new().service(
            web::resource("/login")
                .wrap(RateLimitMiddleware::new(limiter))
                .route(web::post().to(|| async { HttpResponse::Ok().finish() })),
        ),
    )
    .await;

    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/login")
            .insert_header(("X-Forwarded-For", "203.0.113.9"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri("/login")
        .insert_header(("X-Forwarded-For", "203.0.113.9"))
        .to_request();
    let res = test::try_call_service(&app, req).await;
    let err = res.err().expect("fourth request should be limited");
    let res = err.error_response();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok()),
        Some("60")
    );
}

#[actix_web::test]
async fn rate_limiter_budgets_are_per_client() {
    let limiter = Arc::new(RateLimiter::in_memory(&RateLimitSettings {
        max_requests: 1,
        window_secs: 60,
    }));

    let app = test::init_service(
        App::new().service(
            web::resource("/login")
                .wrap(RateLimitMiddleware::new(limiter))
                .route(web::post().to(|| async { HttpResponse::Ok().finish() })),
        ),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/login")
        .insert_header(("X-Forwarded-For", "198.51.100.1"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // A different client still has its full budget
    let req = test::TestRequest::post()
        .uri("/login")
        .insert_header(("X-Forwarded-For", "198.51.100.2"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
