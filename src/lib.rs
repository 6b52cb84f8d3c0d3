// lib.rs for welcome-center
// Shared by the GUI binary and the privileged helper in src/bin/

pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod installer;
pub mod launcher;
pub mod mirrors;
pub mod packages;
pub mod settings;
pub mod utils;
