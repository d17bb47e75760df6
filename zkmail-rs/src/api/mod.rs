//! REST API module for zkmail-rs
//!
//! Provides the HTTP surface: client-facing webmail routes and the
//! server-to-server federation lookup endpoint.

pub mod handlers;
pub mod server;

pub use server::ApiServer;
