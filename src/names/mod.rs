//! Name resolution subsystem.
//!
//! # Data Flow
//! ```text
//! "alice.luca.eth, 0xabc…"
//!     → resolver.rs (split, classify, concurrent lookups, duplicate check)
//!     → client.rs (directory HTTP API)
//!     → ordered address strings
//! ```

pub mod client;
pub mod resolver;

pub use client::{HttpNameService, NameError, NameRecord, NameService};
pub use resolver::{IdentityResolver, ResolveError};
