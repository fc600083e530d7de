//! Core library for aspkg: device-flow login, the session store, and the
//! registry client.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;

pub use api::RegistryClient;
pub use auth::{DeviceFlow, HttpIdentityProvider, IdentityProvider, SessionStore};
pub use config::Config;
pub use error::{Error, Result};
pub use models::PackageManifest;
