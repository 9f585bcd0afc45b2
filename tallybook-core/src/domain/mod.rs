//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod entry;
mod identity;
mod route;
pub mod result;
pub mod validation;

pub use entry::{
    EntryDraft, EntryField, EntryFilter, EntryId, EntryStatus, EntryType, FinancialEntry,
};
pub use identity::{Identity, NewUser, UserId};
pub use result::ValidationError;
pub use route::Route;
pub use validation::{validate_entry, validate_registration};
