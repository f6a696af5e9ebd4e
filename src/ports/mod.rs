//! Port traits the engine's collaborators implement.

pub mod config_port;
pub mod price_source;
pub mod report_port;
