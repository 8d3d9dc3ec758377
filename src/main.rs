use api_rest::{app, AppState};
use api_shared::StaticTokenVerifier;
use odyssey_core::config::{database_name_from_env_value, store_backend_from_env_value};
use odyssey_core::{open_store, CoreConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Odyssey application
///
/// Opens the configured document store, applies the index plan and serves the REST API.
///
/// # Environment Variables
/// - `ODYSSEY_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ODYSSEY_STORE`: `mongodb` (default) or `memory`
/// - `MONGODB_URI`: MongoDB connection string, required for the `mongodb` store
/// - `ODYSSEY_DB_NAME`: database name (default: "odyssey_db")
/// - `API_TOKEN`: bearer token accepted by the API
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, store startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("odyssey=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ODYSSEY_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let api_token = std::env::var("API_TOKEN").unwrap_or_default();
    if api_token.trim().is_empty() {
        anyhow::bail!("API_TOKEN must be set");
    }

    let cfg = CoreConfig::new(
        store_backend_from_env_value(std::env::var("ODYSSEY_STORE").ok())?,
        std::env::var("MONGODB_URI").ok(),
        database_name_from_env_value(std::env::var("ODYSSEY_DB_NAME").ok()),
    )?;
    let store = open_store(&cfg).await?;

    let state = AppState::new(store, Arc::new(StaticTokenVerifier::new(api_token.trim())));

    tracing::info!("++ Starting Odyssey REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
