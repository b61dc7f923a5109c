//! Issuance and exchange flows against the authority.

pub mod exchange;
pub mod maskinporten;
pub mod response;

pub use exchange::enterprise_auth_value;
pub use maskinporten::MaskinportenService;
pub use response::parse_response;
