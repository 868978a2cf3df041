//! HTTP transport for the upstream REST services.

pub mod client;
pub mod retry;

pub use client::UpstreamHttp;
pub use retry::{RetryConfig, RetryPolicy};
