//! Registry API client module.
//!
//! This module provides the `RegistryClient` for publishing packages and
//! querying the identity of the logged-in user. Every call requires a
//! stored session token.

pub mod client;

pub use client::RegistryClient;
