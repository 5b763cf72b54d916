//! Bisect Visualization Server
//!
//! Build a sequence from the configured settings and serve playback controls.

use bisect_vis::{Playback, SettingChange, Settings, VisServer};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bisect_vis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line args: [port] [seed]
    let args: Vec<String> = env::args().collect();

    let port: u16 = args.get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);

    let mut settings = Settings::from_env()?;
    if let Some(seed) = args.get(2).and_then(|s| s.parse().ok()) {
        settings.apply(SettingChange::Seed(seed));
    }

    let playback = Playback::new(settings);
    tracing::info!(
        len = playback.sequence().len(),
        target = %playback.target(),
        steps = playback.trace().len(),
        seed = playback.settings().seed,
        "sequence ready"
    );

    let server = VisServer::new(playback);
    server.serve(port).await?;

    Ok(())
}
