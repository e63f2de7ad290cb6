//! Data models and configuration.

pub mod config;
pub mod record;
pub mod rules;
pub mod schema;
