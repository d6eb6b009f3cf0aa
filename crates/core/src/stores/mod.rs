pub mod memory;
pub mod qdrant;
pub mod sqlite;

pub use memory::{MemoryIndex, MemoryStore};
pub use qdrant::QdrantStore;
pub use sqlite::SqliteStore;
