use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use appdeck_api::auth::{self, AppState, AppStateInner};
use appdeck_api::middleware::require_auth;
use appdeck_api::{apps, comments, sweep, upvotes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appdeck=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("APPDECK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let sweep_token =
        std::env::var("APPDECK_SWEEP_TOKEN").unwrap_or_else(|_| "dev-sweep-token-change-me".into());
    let db_path = std::env::var("APPDECK_DB_PATH").unwrap_or_else(|_| "appdeck.db".into());
    let host = std::env::var("APPDECK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("APPDECK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = appdeck_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        sweep_token,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/apps", get(apps::list_apps))
        .route("/apps/{slug}", get(apps::get_app))
        .route("/apps/{slug}/comments", get(comments::list_comments))
        .route("/internal/sweep", get(sweep::run_sweep))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/apps", post(apps::create_app))
        .route("/apps/{slug}", patch(apps::update_app))
        .route("/apps/{slug}", delete(apps::delete_app))
        .route("/apps/{slug}/comments", post(comments::create_comment))
        .route(
            "/apps/{slug}/comments/deleted",
            get(comments::app_deleted_comments),
        )
        .route("/apps/{slug}/upvote", post(upvotes::toggle_upvote))
        .route("/comments/{comment_id}", delete(comments::delete_own_comment))
        .route(
            "/comments/{comment_id}/moderate",
            post(comments::moderate_comment),
        )
        .route("/me/apps", get(apps::my_apps))
        .route("/me/comments/deleted", get(comments::my_deleted_comments))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Appdeck server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
