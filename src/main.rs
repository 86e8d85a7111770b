//! overlaid: renders a static set of text and image widgets as a transparent
//! overlay window on top of gamescope.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overlaid::{Catalog, OverlayWindow, Scene};

/// Frame throttle for the software renderer (~60 FPS)
const FRAME_DURATION: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(version, about = "Renders overlay widgets on top of gamescope")]
struct Cli {
    /// Widget definitions as a JSON array
    widgets: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let catalog = Catalog::load(&cli.widgets).context("failed to load widget definitions")?;
    info!(widgets = catalog.len(), "widget catalog loaded");

    let mut window =
        OverlayWindow::new("overlaid overlay window").context("failed to create overlay window")?;
    let mut scene = Scene::new(catalog);

    let mut last_frame = Instant::now();

    while window.poll_events() {
        let now = Instant::now();
        if now.duration_since(last_frame) >= FRAME_DURATION {
            // Track the work area every frame so the overlay keeps covering
            // the monitor even if its configuration changes mid-run.
            let area = window.work_area();
            window.set_geometry(area);

            let (width, height) = (window.width(), window.height());
            scene.render(window.pixel_buffer(), width, height);
            window.commit();

            last_frame = now;
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(Duration::from_millis(1));
    }

    info!("overlay window closed");
    Ok(())
}
