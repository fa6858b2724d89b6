//! Versioned secret store backends

mod memory;
mod traits;


pub use memory::MemoryStore;
pub use traits::{
    Replication, SecretInfo, SecretStore, StoreError, VersionInfo, VersionState,
};
