//! Storage backends for cached payloads.

pub mod fs;
pub mod memory;
pub mod traits;

pub use fs::FsBackend;
pub use memory::InMemoryBackend;
pub use traits::{Backend, StorageError};
