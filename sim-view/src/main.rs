//! Application entry point for the 2D particle viewer.
//!
//! Sets up logging and eframe/egui, then hands everything else to
//! [`Viewer`] from the `viewer` module.

mod viewer;

use tracing_subscriber::EnvFilter;
use viewer::Viewer;

/// Starts the native eframe application.
///
/// Log verbosity follows `RUST_LOG` and defaults to `info`.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if eframe fails to create the native window or event loop, or the
///   default simulation configuration is rejected.
fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1500.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "2D Particle Kinetics",
        options,
        Box::new(|_cc| Ok(Box::new(Viewer::new()?))),
    )
}
