// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `Eventdesk` Q&A backend.

pub mod rate_limit;

pub use rate_limit::RateLimiter;
