//! # greenai-auth
//!
//! Bearer credential handling for GreenAI realtime connections.
//!
//! - `jwt`: JWT claims, verification with revocation checking, and issuance

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
