//! Plaza server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use plaza_common::Config;
use plaza_core::{
    CommunityService, FeedService, ModerationService, PostService, RankTrigger, RebuildQueue,
    ReportService, TrustService,
};
use plaza_db::repositories::{
    CommunityRepository, FeedRepository, ModerationRepository, PostRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod response;
mod routes;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plaza=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting plaza server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(plaza_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    plaza_db::migrate(&db).await?;
    info!("Migrations completed");

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let community_repo = CommunityRepository::new(Arc::clone(&db));
    let feed_repo = FeedRepository::new(Arc::clone(&db));
    let moderation_repo = ModerationRepository::new(Arc::clone(&db));

    // Services
    let feed_service = FeedService::new(
        community_repo.clone(),
        post_repo.clone(),
        feed_repo.clone(),
    );
    let rebuild_queue = RebuildQueue::spawn(feed_service.clone());
    let trigger = RankTrigger::new(
        rebuild_queue,
        community_repo.clone(),
        post_repo.clone(),
    );
    let trust_service = TrustService::new(user_repo.clone());
    let post_service = PostService::new(
        post_repo.clone(),
        community_repo.clone(),
        trust_service.clone(),
        trigger.clone(),
    );
    let report_service = ReportService::new(
        moderation_repo.clone(),
        post_repo.clone(),
        user_repo.clone(),
        trust_service,
    );
    let moderation_service = ModerationService::new(
        moderation_repo,
        post_repo,
        user_repo.clone(),
        community_repo.clone(),
        trigger.clone(),
    );
    let community_service = CommunityService::new(community_repo, user_repo, trigger.clone());

    // Daily feed sweep
    let sweep_service = feed_service.clone();
    let sweep_interval = Duration::from_secs(config.feed.sweep_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup is not a
        // full sweep.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = sweep_service.materialize_all(None).await {
                tracing::error!(error = %e, "Scheduled feed sweep failed");
            }
        }
    });
    info!(interval_secs = sweep_interval.as_secs(), "Feed sweep scheduled");

    // Router
    let state = routes::AppState {
        feed_service,
        post_service,
        report_service,
        moderation_service,
        community_service,
        trigger,
    };
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
