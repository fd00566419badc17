//! Application services: the operations exposed over HTTP, the CLI and cron jobs.

pub mod analytics;
pub mod articles;
pub mod auth;
pub mod error;
pub mod generation;
pub mod jobs;
pub mod keywords;
pub mod monitor;
pub mod newsletter;
pub mod pagination;
pub mod repos;
pub mod scheduler;
