use std::sync::Arc;

use petcare_backend::{logging, routes, AppState, Config, HttpIdentityProvider};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    logging::init(&config.logging.level);

    tracing::info!("Starting PetCare sign-in gateway");
    tracing::info!(
        "Identity provider {} (project {})",
        config.identity.endpoint,
        config.identity.project_id
    );

    let provider = Arc::new(HttpIdentityProvider::new(&config.identity));
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, provider));

    let app = routes::app(state);

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
