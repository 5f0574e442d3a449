//! Content-addressed storage.
//!
//! # Data Flow
//! ```text
//! image bytes
//!     → client.rs (multipart upload to the pinning endpoint)
//!     → ContentRef { cid, path } (parsed, typed)
//!     → locator "<cid>/<path>" stored on chain
//! ```

pub mod client;

pub use client::{ContentRef, ContentStore, FilePayload, HttpContentStore, StorageError};
