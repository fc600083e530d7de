//! Data models for the identity provider and the registry.
//!
//! - `DeviceAuthorization`, `TokenGrant`, `PollResponse`: device-flow wire types
//! - `User`: the current-user response used by `whoami`
//! - `PackageManifest`: the `package.json` being published

pub mod oauth;
pub mod package;

pub use oauth::{
    DeviceAuthorization, DeviceCodeRequest, PollResponse, TokenGrant, TokenRequest, User,
    DEVICE_CODE_GRANT_TYPE,
};
pub use package::PackageManifest;
