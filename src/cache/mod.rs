//! Token cache: the pluggable provider trait and the in-memory default.

pub mod token;
pub mod token_cache;
pub mod token_context;

pub use token::TokenResponse;
pub use token_cache::{cache_ttl, exchange_cache_key, MemoryTokenCache, TokenCacheProvider};
