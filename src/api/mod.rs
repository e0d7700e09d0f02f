//! HTTP transport (§10): a thin translator in front of the core pipelines.

pub mod handlers;
pub mod server;
pub mod types;
