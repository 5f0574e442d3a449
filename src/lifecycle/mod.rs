//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! config → startup.rs (clients, signer, services) → Orchestrator
//! Ctrl+C → Shutdown::trigger → HTTP server stops accepting → drain → exit
//! ```
//!
//! Workflows still running at shutdown are abandoned with the runtime.

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
