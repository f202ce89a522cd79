//! Registry module
//!
//! - `id`: service identifiers
//! - `types`: the service record
//! - `storage`: the lock-guarded in-memory registry
//! - `error`: business errors reported to callers

pub mod error;
pub mod id;
pub mod storage;
pub mod types;

// Re-export public types for easier access
pub use error::CatalogError;
pub use id::Identifier;
pub use storage::Storage;
pub use types::ServiceRecord;
