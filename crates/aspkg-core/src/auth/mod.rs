//! Authentication module for device-flow login and session persistence.
//!
//! This module provides:
//! - `SessionStore`: the session file, loaded and saved by background tasks
//! - `DeviceFlow`: the OAuth device authorization state machine
//! - `IdentityProvider`: the HTTP seam the state machine talks through
//!
//! The session is a single JSON file holding the access token.

pub mod device_flow;
pub mod provider;
pub mod session;

pub use device_flow::{DeviceFlow, FlowState, PollSchedule};
pub use provider::{HttpIdentityProvider, IdentityProvider};
pub use session::{Session, SessionStore};
