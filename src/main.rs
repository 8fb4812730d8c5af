// Social Hub Server - JSON API over the social data layer

use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use social_hub::{app_state::AppState, config::Config, create_social_router};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    // Drop expired sessions in the background
    let auth = app_state.social.auth().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = auth.cleanup_expired_sessions().await;
            if removed > 0 {
                debug!("Removed {} expired sessions", removed);
            }
        }
    });

    let social_router = create_social_router(app_state.social.clone());

    // Build main application router
    let app = Router::new()
        .nest("/api/v1", social_router)
        .nest_service("/storage", ServeDir::new(&config.storage.root))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Social Hub server listening on http://{}", addr);
    info!("  POST   /api/v1/auth/sign-up                 - Register");
    info!("  POST   /api/v1/auth/sign-in                 - Sign in");
    info!("  GET    /api/v1/feed/{{view}}                  - for-you | following | explore");
    info!("  POST   /api/v1/posts                        - Create post");
    info!("  POST   /api/v1/posts/{{post_id}}/like         - Toggle like");
    info!("  GET    /api/v1/conversations                - Conversations");
    info!("  GET    /api/v1/notifications                - Notifications");

    axum::serve(listener, app).await?;

    Ok(())
}
