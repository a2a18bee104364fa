//! HTTP API: configuration, authentication, routing and error mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
