//! Resilience helpers.
//!
//! Every external call has a deadline (enforced at the call site with
//! `tokio::time::timeout`). Receipt polling backs off exponentially with
//! jitter between attempts.

pub mod backoff;
