// Main entry point for GUI module
pub mod app;
pub mod dialogs;
pub mod events;
pub mod widgets;

pub use app::run_gui;
