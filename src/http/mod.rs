//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! request
//!     → server.rs (request id, trace, timeout, body limit)
//!     → forms.rs (shape validation, 400 prompts)
//!     → students.rs / treasury.rs / names.rs / admin (spawn or read)
//!     → views.rs (loading | form | result | error)
//! ```

pub mod error;
pub mod forms;
pub mod names;
pub mod server;
pub mod students;
pub mod treasury;
pub mod views;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
