//! Demo HTTP surface exercising the request logging middleware.
//!
//! # Modules
//!
//! - [`handlers`] - HTTP request handlers
//! - [`routes`] - Route configuration and logging policy

pub mod handlers;
pub mod routes;
