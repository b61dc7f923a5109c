//! Signed JWT assertions presented to the authority in the JWT-bearer grant.

pub mod builder;

pub use builder::{build_assertion, AssertionClaims};
