pub mod in_memory;
pub mod sqlite_store;
pub mod store;

pub use in_memory::{InMemoryLogStore, InMemoryThreadStore};
pub use sqlite_store::SqliteStore;
pub use store::{EventEntry, LogStore, ThreadStore, TraceDirection, TraceEntry};
