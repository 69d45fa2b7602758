//! # Crush Common Library
//!
//! Shared code for the Crush client crates including:
//! - Common error and result types
//! - Configuration loading (TOML bootstrap file, environment, defaults)
//! - Client event types and the broadcast event bus
//! - The navigable route table

pub mod config;
pub mod error;
pub mod events;
pub mod routes;

pub use error::{Error, Result};
pub use events::{ClientEvent, EventBus};
pub use routes::Route;
