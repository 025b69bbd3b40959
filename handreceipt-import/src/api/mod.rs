//! HTTP API handlers for handreceipt-import

pub mod health;
pub mod imports;

pub use health::health_routes;
pub use imports::import_routes;
