use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_service::config::Config;
use marketplace_service::db::{create_pool, run_migrations};
use marketplace_service::middleware::RateLimiter;
use marketplace_service::routes::configure_routes;
use marketplace_service::security::jwt;
use marketplace_service::services::storage::LocalImageStore;
use marketplace_service::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("Bad configuration: {}", e))
    })?;

    tracing::info!("Starting marketplace-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // An unconfigured secret gets a random ephemeral one, so tokens
    // stop working across restarts until JWT_SECRET is set.
    if config.jwt_secret_is_placeholder() {
        tracing::warn!("JWT_SECRET is not configured, using an ephemeral secret");
        jwt::initialize_keys(&jwt::generate_ephemeral_secret());
    } else {
        jwt::initialize_keys(&config.jwt.secret);
    }

    let db_pool = create_pool(&config.database)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))?;

    tracing::info!(
        "Database pool created with {} max connections",
        config.database.max_connections
    );

    run_migrations(&db_pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    tracing::info!("Database migrations completed");

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let images = Arc::new(LocalImageStore::new(
        config.uploads.dir.clone(),
        config.uploads.base_url.clone(),
    ));

    let limiter = Arc::new(RateLimiter::in_memory(&config.rate_limit));

    let config = Arc::new(config);
    let state = AppState::new(db_pool, config.clone(), images);

    let bind_addr = (config.app.host.clone(), config.app.port);
    tracing::info!("Listening on {}:{}", bind_addr.0, bind_addr.1);

    let uploads_dir = config.uploads.dir.clone();
    let uploads_base_url = config.uploads.base_url.clone();

    let cors_origins = config.app.cors_allowed_origins.clone();

    HttpServer::new(move || {
        // No configured origins means any origin, for local development
        let mut cors = if cors_origins.is_empty() {
            Cors::default().allow_any_origin()
        } else {
            Cors::default()
        };
        for origin in &cors_origins {
            cors = cors.allowed_origin(origin);
        }
        let cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let limiter = limiter.clone();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(move |cfg| configure_routes(cfg, limiter))
            .service(Files::new(&uploads_base_url, &uploads_dir))
    })
    .bind(bind_addr)?
    .run()
    .await
}
