//! Client for the Luca3Auth student service.

pub mod client;

pub use client::{ApiResponse, Luca3Client};
