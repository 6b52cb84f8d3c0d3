mod gui;

use gtk4::glib;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gui::run_gui;

fn main() -> glib::ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting welcome center");
    run_gui()
}
