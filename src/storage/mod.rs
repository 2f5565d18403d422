//! Storage for profiles, readings and notifications.
//!
//! The monitor talks only to the traits in this module. Two backends are
//! provided: an in-memory one for embedding and tests, and (with the
//! `persistent` feature) a WAL-backed one for durable deployments.

mod index;
pub mod memory;
#[cfg(feature = "persistent")]
pub mod persistent;
mod traits;

pub use memory::{InMemoryNotificationStore, InMemoryProfileStore, InMemoryReadingLog, InMemoryStores};
#[cfg(feature = "persistent")]
pub use persistent::{open_database, PersistentConfig, PersistentStores};
pub use traits::{NotificationStore, ProfileStore, ReadingLog, StorageError};
