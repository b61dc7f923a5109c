//! # Maskinporten Client Library
//!
//! Acquires OAuth2 JWT-bearer access tokens from Maskinporten, caches them
//! until shortly before they expire, and optionally exchanges them for
//! Altinn platform tokens.
//!
//! Modules:
//! - `assertion`: signed JWT assertions for the JWT-bearer grant
//! - `cache`: pluggable token cache and the in-memory default
//! - `credentials`: signing keys, certificates and client definitions
//! - `service`: issuance and exchange flows, response classification
//! - `config`: YAML configuration of clients and settings

pub mod assertion;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod environment;
pub mod errors;
pub mod helpers;
pub mod identity;
pub mod observability;
pub mod service;
pub mod single_flight;
pub mod tests;
pub mod utils;


pub use crate::cache::{MemoryTokenCache, TokenCacheProvider, TokenResponse};
pub use crate::credentials::{ClientDefinition, ClientSecrets, SettingsClientDefinition, SigningKey};
pub use crate::environment::{EndpointSet, Environment};
pub use crate::errors::{ErrorOutcome, MaskinportenError};
pub use crate::identity::{ClientIdentity, EnterpriseCredentials};
pub use crate::service::MaskinportenService;
