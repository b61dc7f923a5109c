//! Credential material and the client definitions that supply it.

pub mod definition;
pub mod secrets;

pub use definition::{ClientDefinition, SettingsClientDefinition};
pub use secrets::{ClientSecrets, SigningKey};
