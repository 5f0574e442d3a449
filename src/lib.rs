//! Luca3Auth student identity and campus-card wallet service.

pub mod admin;
pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod names;
pub mod observability;
pub mod orchestrator;
pub mod pricing;
pub mod resilience;
pub mod storage;
pub mod treasury;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use orchestrator::{Orchestrator, Services};
