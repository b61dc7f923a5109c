//! Shared constants and invariants

/// Seconds subtracted from `expires_in` before a token is cached.
pub const CACHE_SAFETY_MARGIN_SECS: u64 = 5;
/// Lifetime of a signed assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 10;

pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const EXCHANGED_TOKEN_TYPE: &str = "altinn";
pub const ENTERPRISE_USER_HEADER: &str = "X-Altinn-EnterpriseUser-Authentication";

// Supported environments
pub const ENV_PROD: &str = "prod";
pub const ENV_VER1: &str = "ver1";
pub const ENV_VER2: &str = "ver2";

// Flow labels used in logs and metrics
pub const FLOW_ISSUE: &str = "issue";
pub const FLOW_EXCHANGE: &str = "exchange";
