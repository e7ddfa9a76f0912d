//! HTTP handlers for the relay.

pub mod generate;
pub mod health;
pub mod papers;

pub use generate::{generate, RESULT_HEADER};
pub use health::{health_check, metrics, preflight};
pub use papers::search_papers;
