//! Typing indicators with automatic timeout.

pub mod coordinator;
pub mod timer;

pub use coordinator::TypingCoordinator;
pub use timer::KeyedTimers;
