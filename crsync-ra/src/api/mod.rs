//! HTTP API handlers for crsync-ra

pub mod health;
pub mod recordings;
pub mod sync;

pub use health::health_routes;
pub use recordings::recording_routes;
pub use sync::sync_routes;
