pub mod raw_message;
pub mod user_login;

// Re-export core models for easy access
pub use raw_message::{AckEntry, AckFailure, RawMessage};
pub use user_login::{LoginEventInput, PersistedLogin};
