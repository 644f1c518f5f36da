// # Built-in Backends
//
// In-memory implementations of RecordSource and SearchIndex, and the
// snapshot format that seeds the record store.

pub mod index;
pub mod memory;
pub mod snapshot;

pub use index::MemorySearchIndex;
pub use memory::MemoryRecordStore;
pub use snapshot::{Association, SNAPSHOT_FILE_VERSION, Snapshot, Tagging};
