//! Kakao OAuth authentication
//!
//! Handles:
//! - Kakao OAuth redirect and callback
//! - Token exchange and profile lookup
//! - Optional state nonce check

pub mod kakao;
mod oauth;

pub use oauth::auth_router;
