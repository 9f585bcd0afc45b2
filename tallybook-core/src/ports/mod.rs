//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod repository;
mod session_storage;

pub use repository::{BalanceProvider, EntryRepository, UserRepository};
pub use session_storage::SessionStorage;
