//! Infrastructure adapters and runtime bootstrap.

pub mod ai;
pub mod app;
pub mod db;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod http;
pub mod store;
pub mod telemetry;
