//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment secrets
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! Config is immutable once loaded. All fields have defaults to allow
//! minimal configs.

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AppConfig;
pub use schema::{
    AdminConfig, ChainConfig, ContractsConfig, NamesConfig, ObservabilityConfig, PriceConfig,
    RegistrationConfig, ServerConfig, SessionConfig, StorageConfig,
};
