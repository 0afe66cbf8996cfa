//! Upload storage.
//!
//! Name generation and the local directory uploads are written to.

pub mod namer;
pub mod storage;

pub use namer::{extension_of, fresh_name, generate_name};
pub use storage::{LocalFileStorage, PendingFile, StorageError, StoredFile};
