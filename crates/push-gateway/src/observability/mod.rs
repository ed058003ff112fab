//! Health endpoints and metric recording helpers.

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
