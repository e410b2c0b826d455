//! Backend and session-provider implementations

pub mod gotrue;
pub mod in_memory;
pub mod postgrest;

pub use gotrue::GoTrueSessionProvider;
pub use in_memory::{InMemoryBackend, InMemorySessionProvider};
pub use postgrest::PostgrestClient;
