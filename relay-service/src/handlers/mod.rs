//! HTTP handlers for the relay service.

pub mod ai;
pub mod health;
pub mod home;
pub mod metrics;

pub use ai::{ai_body, ai_query};
pub use health::{health_check, not_found};
pub use home::home;
pub use metrics::metrics;
