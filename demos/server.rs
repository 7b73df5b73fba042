//! Example server: connects the client (creating the database and applying migrations when enabled)
//! and serves the REST routes over it.

use photo_orders::{app_router, telemetry, AppState, Client, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init("photo_orders=info,tower_http=info");

    let settings = Settings::from_env()?;
    let client = Client::connect(&settings).await?;
    let app = app_router(AppState::from_client(&client));

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    client.disconnect().await;
    Ok(())
}
