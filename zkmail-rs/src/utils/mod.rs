//! Utility modules
//!
//! - [`dns`]: MX lookup against real DNS
//! - [`validation`]: input validators for tokens, hashes and hex blobs

pub mod dns;
pub mod validation;
