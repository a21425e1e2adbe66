//! Durable key-value storage for session state.
//!
//! `SessionCache` only needs `get`/`set`/`remove` on string values, so the
//! backing store is injected:
//! - `MemoryStore`: process-local, used in tests and for throwaway sessions
//! - `FileStore`: one file per key in a directory shared by every process
//!   pointed at it

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}
