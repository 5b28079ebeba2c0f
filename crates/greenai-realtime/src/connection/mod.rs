//! Connection lifecycle: handles, the registry, and credential checks.

pub mod authenticator;
pub mod handle;
pub mod registry;

pub use authenticator::ConnectionAuthenticator;
pub use handle::{ConnectionHandle, ConnectionMeta};
pub use registry::{ConnectionRegistry, Deregistered, Registered};
