//! Secret lifecycle management for Secretgate
//!
//! Provides the manager that resolves "the current value of a secret"
//! across an append-only version history, with support for:
//! - list, get, create, update, delete
//! - single-enabled-version semantics on top of the version log
//! - a process-local read-through cache keyed by canonical resource name

pub mod manager;
pub mod store;

pub use manager::{ManagerError, Secret, SecretManager};
pub use store::{
    MemoryStore, Replication, SecretInfo, SecretStore, StoreError, VersionInfo, VersionState,
};
