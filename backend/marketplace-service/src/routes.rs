//! Route configuration
//!
//! Centralized route setup extracted from main.rs
//! Each domain (auth, listings, messages, etc.) manages its own routes
//!
//! Scopes that are protected end to end carry JwtAuthMiddleware; on
//! routes that mix public and protected methods the UserId extractor
//! validates the bearer token itself. Literal paths are registered
//! before `{id}` so "/users/me" never resolves as an id.

use std::sync::Arc;

use actix_web::web;

use crate::handlers;
use crate::middleware::{JwtAuthMiddleware, RateLimitMiddleware, RateLimiter};

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: Arc<RateLimiter>) {
    cfg.route("/health", web::get().to(handlers::health::health_check))
        .service(
            web::scope("/api")
                .configure({
                    let limiter = limiter.clone();
                    move |c| routes::auth::configure(c, limiter)
                })
                .configure(routes::users::configure)
                .configure(routes::listings::configure)
                .configure(routes::messages::configure)
                .configure(routes::reviews::configure)
                .configure(routes::reports::configure)
                .configure(move |c| routes::admin::configure(c, limiter)),
        );
}

// Sub-modules for each domain
mod routes {
    use super::*;

    pub mod auth {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig, limiter: Arc<RateLimiter>) {
            cfg.service(
                web::scope("/auth")
                    .route("/me", web::get().to(handlers::auth::me))
                    // Credential endpoints carry a per-client budget
                    .service(
                        web::scope("")
                            .wrap(RateLimitMiddleware::new(limiter))
                            .route("/register", web::post().to(handlers::auth::register))
                            .route("/login", web::post().to(handlers::auth::login))
                            .route("/google", web::post().to(handlers::auth::google_login))
                            .route(
                                "/google-token",
                                web::post().to(handlers::auth::google_token_login),
                            ),
                    ),
            );
        }
    }

    pub mod users {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/users")
                    .route("/me", web::get().to(handlers::users::get_my_profile))
                    .route("/me", web::put().to(handlers::users::update_profile))
                    .route("/{id}", web::get().to(handlers::users::get_user_profile))
                    .route(
                        "/{id}/listings",
                        web::get().to(handlers::users::get_user_listings),
                    )
                    .route(
                        "/{id}/reviews",
                        web::get().to(handlers::users::get_user_reviews),
                    ),
            );
        }
    }

    pub mod listings {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/listings")
                    .route("", web::get().to(handlers::listings::browse))
                    .route("", web::post().to(handlers::listings::create_listing))
                    .route("/user/me", web::get().to(handlers::listings::my_listings))
                    .route(
                        "/favorites/me",
                        web::get().to(handlers::listings::my_favorites),
                    )
                    .route(
                        "/{id}/favorite",
                        web::post().to(handlers::listings::add_favorite),
                    )
                    .route(
                        "/{id}/favorite",
                        web::delete().to(handlers::listings::remove_favorite),
                    )
                    .route("/{id}", web::get().to(handlers::listings::get_listing))
                    .route("/{id}", web::put().to(handlers::listings::update_listing))
                    .route(
                        "/{id}",
                        web::delete().to(handlers::listings::delete_listing),
                    ),
            );
        }
    }

    pub mod messages {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/messages")
                    .wrap(JwtAuthMiddleware)
                    .route("", web::post().to(handlers::messages::send_message))
                    .route(
                        "/conversations",
                        web::get().to(handlers::messages::get_conversations),
                    )
                    .route(
                        "/conversation/{other_user_id}/{listing_id}",
                        web::get().to(handlers::messages::get_conversation_messages),
                    )
                    .route(
                        "/conversation/{other_user_id}",
                        web::get().to(handlers::messages::get_direct_conversation_messages),
                    )
                    .route(
                        "/unread/count",
                        web::get().to(handlers::messages::unread_count),
                    )
                    .route(
                        "/{id}/read",
                        web::put().to(handlers::messages::mark_message_read),
                    ),
            );
        }
    }

    pub mod reviews {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/reviews")
                    .route("", web::post().to(handlers::reviews::create_review))
                    .route(
                        "/listing/{id}",
                        web::get().to(handlers::reviews::get_listing_reviews),
                    )
                    .route(
                        "/my-reviews",
                        web::get().to(handlers::reviews::my_received_reviews),
                    )
                    .route("/given", web::get().to(handlers::reviews::my_given_reviews))
                    .route("/{id}", web::delete().to(handlers::reviews::delete_review)),
            );
        }
    }

    pub mod reports {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/reports")
                    .wrap(JwtAuthMiddleware)
                    .route("", web::post().to(handlers::reports::create_report)),
            );
        }
    }

    pub mod admin {
        use super::*;

        pub fn configure(cfg: &mut web::ServiceConfig, limiter: Arc<RateLimiter>) {
            cfg.service(
                web::scope("/admin")
                    .service(
                        web::resource("/login")
                            .wrap(RateLimitMiddleware::new(limiter))
                            .route(web::post().to(handlers::admin::admin_login)),
                    )
                    .route("/verify", web::get().to(handlers::admin::verify_admin))
                    .route(
                        "/dashboard/stats",
                        web::get().to(handlers::admin::dashboard_stats),
                    )
                    .route(
                        "/dashboard/activity",
                        web::get().to(handlers::admin::recent_activity),
                    )
                    .route("/users", web::get().to(handlers::admin::list_users))
                    .route(
                        "/users/{id}/ban",
                        web::put().to(handlers::moderation::ban_user),
                    )
                    .route(
                        "/users/{id}/unban",
                        web::put().to(handlers::moderation::unban_user),
                    )
                    .route(
                        "/users/{id}/role",
                        web::put().to(handlers::moderation::change_role),
                    )
                    .route("/users/{id}", web::get().to(handlers::admin::user_detail))
                    .route(
                        "/users/{id}",
                        web::delete().to(handlers::moderation::delete_user),
                    )
                    .route(
                        "/listings",
                        web::get().to(handlers::moderation::list_listings),
                    )
                    .route(
                        "/listings/{id}/hide",
                        web::put().to(handlers::moderation::hide_listing),
                    )
                    .route(
                        "/listings/{id}/show",
                        web::put().to(handlers::moderation::show_listing),
                    )
                    .route(
                        "/listings/{id}/feature",
                        web::put().to(handlers::moderation::toggle_feature),
                    )
                    .route(
                        "/listings/{id}",
                        web::delete().to(handlers::moderation::delete_listing),
                    )
                    .route(
                        "/reports",
                        web::get().to(handlers::moderation::list_reports),
                    )
                    .route(
                        "/reports/{id}/review",
                        web::put().to(handlers::moderation::review_report),
                    )
                    .route(
                        "/reports/{id}",
                        web::get().to(handlers::moderation::report_detail),
                    )
                    .route(
                        "/analytics/users",
                        web::get().to(handlers::admin::user_analytics),
                    )
                    .route(
                        "/analytics/listings",
                        web::get().to(handlers::admin::listing_analytics),
                    )
                    // Category listing is public: the storefront uses it
                    .route(
                        "/categories",
                        web::get().to(handlers::admin::list_categories),
                    )
                    .route(
                        "/categories",
                        web::post().to(handlers::admin::create_category),
                    )
                    .route(
                        "/categories/{id}",
                        web::delete().to(handlers::admin::delete_category),
                    )
                    .route(
                        "/activity-log",
                        web::get().to(handlers::admin::activity_log),
                    ),
            );
        }
    }
}
