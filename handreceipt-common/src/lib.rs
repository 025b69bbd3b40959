//! # Hand Receipt Common Library
//!
//! Shared code for the hand receipt import service and its tooling:
//! - Error type (`Error`, `Result`)
//! - TOML configuration loading and root folder resolution
//! - Import event types and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
