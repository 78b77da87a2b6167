use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use petcontrol_api::config::Config;
use petcontrol_api::services::auth::UserInfoCache;
use petcontrol_api::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let userinfo_cache = Arc::new(UserInfoCache::new(Duration::from_secs(
        config.userinfo_cache_ttl_secs,
    )));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let state = AppState {
        db: pool,
        config: config.clone(),
        http,
        userinfo_cache,
    };

    // CORS: the configured frontend origin plus localhost for development.
    let cors_origin = {
        let frontend = config.frontend_url.clone();
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let o = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };
            if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
                return true;
            }
            o == frontend
        })
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Profiles
        .route(
            "/profiles/me",
            get(routes::profiles::get_me).put(routes::profiles::upsert_me),
        )
        .route("/vets/search", get(routes::profiles::search_vets))
        // Pets
        .route(
            "/pets",
            get(routes::pets::list_pets).post(routes::pets::create_pet),
        )
        .route("/pets/nickname/{nickname}", get(routes::pets::find_by_nickname))
        .route(
            "/pets/{id}",
            get(routes::pets::get_pet)
                .put(routes::pets::update_pet)
                .delete(routes::pets::delete_pet),
        )
        .route(
            "/pets/{id}/vets",
            get(routes::pets::list_vets).post(routes::pets::grant_vet),
        )
        .route("/pets/{id}/vets/{vet_id}", delete(routes::pets::revoke_vet))
        // Treatments
        .route(
            "/pets/{id}/treatments",
            get(routes::treatments::list_treatments).post(routes::treatments::add_treatment),
        )
        .route(
            "/pets/{id}/treatments/{treatment_id}",
            put(routes::treatments::update_treatment)
                .delete(routes::treatments::delete_treatment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Pet Control API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
