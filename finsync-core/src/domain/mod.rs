//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod institution;
mod item;
pub mod payload;
pub mod result;

pub use account::{AccountSnapshot, SimplefinAccount};
pub use institution::Institution;
pub use item::{Item, ItemStatus};
pub use payload::{AccountPayload, AccountsPayload, OrgPayload, TransactionPayload};
