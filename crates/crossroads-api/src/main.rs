//! Crossroads API server entry point.

use std::error::Error;
use std::sync::Arc;

use crossroads_core::clock::SystemClock;
use crossroads_narrative::application::loader;
use crossroads_session::application::coordinator::SessionCoordinator;

use crossroads_api::config::ServerConfig;
use crossroads_api::state::AppState;
use crossroads_api::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Read configuration from environment.
    let config = ServerConfig::from_env()?;

    // Initialize tracing subscriber.
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Crossroads API server");

    // Load the story.
    let story = match &config.story_path {
        Some(path) => loader::load_story(path)?,
        None => loader::bundled_story()?,
    };
    let story = Arc::new(story);
    tracing::info!(
        title = story.title(),
        nodes = story.len(),
        version_hash = story.version_hash(),
        "story ready"
    );

    // Start the session coordinator.
    let (session, _coordinator) = SessionCoordinator::spawn(
        Arc::clone(&story),
        Arc::new(SystemClock),
        config.coordinator(),
    );

    // Build router.
    let app = crossroads_api::app(AppState::new(session, story));

    // Start server.
    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(%err, "could not listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down");
    telemetry.shutdown();

    Ok(())
}
