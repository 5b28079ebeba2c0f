//! # greenai-core
//!
//! Core crate for the GreenAI community platform's realtime layer. Contains
//! configuration schemas, typed identifiers, notification and usage types,
//! the traits implemented by external collaborators (identity, storage,
//! plan lookup, offline delivery), and the unified error system.
//!
//! This crate has **no** internal dependencies on other GreenAI crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
