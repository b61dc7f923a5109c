//! Behavioural tests, run against `httpmock` authorities.

#[cfg(test)]
pub mod common;

pub mod assertion_claims;
