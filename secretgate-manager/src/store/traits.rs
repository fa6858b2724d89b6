//! Storage backend traits

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Replication policy for a new secret resource.
///
/// Only automatic (unconfigured regional placement) is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Replication {
    #[default]
    Automatic,
}

/// Lifecycle state of a secret version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    Enabled,
    Disabled,
}

/// Descriptor for a secret resource
#[derive(Debug, Clone)]
pub struct SecretInfo {
    /// Canonical resource path (`projects/{project}/secrets/{id}`)
    pub name: String,
    /// Creation time
    pub create_time: DateTime<Utc>,
}

/// Descriptor for a single version of a secret
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Canonical version path (`.../secrets/{id}/versions/{n}`)
    pub name: String,
    /// Lifecycle state
    pub state: VersionState,
    /// Creation time
    pub create_time: DateTime<Utc>,
}

/// A versioned secret store.
///
/// The durable side of the system: secrets are resources addressed by
/// canonical path, each carrying an append-only log of payload versions.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Enumerate secrets under a project scope (`projects/{project}`).
    async fn list_secrets(&self, parent: &str) -> Result<Vec<SecretInfo>, StoreError>;

    /// Create a secret resource under a project scope. The new secret has
    /// no versions until one is added.
    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
        replication: Replication,
    ) -> Result<SecretInfo, StoreError>;

    /// Append a version carrying `payload` to a secret. The new version
    /// starts out enabled.
    async fn add_version(
        &self,
        secret_name: &str,
        payload: Bytes,
    ) -> Result<VersionInfo, StoreError>;

    /// Enumerate versions of a secret, newest first. Callers rely on the
    /// ordering.
    async fn list_versions(&self, secret_name: &str) -> Result<Vec<VersionInfo>, StoreError>;

    /// Fetch a version's payload by its canonical version path.
    async fn access_version(&self, version_name: &str) -> Result<Bytes, StoreError>;

    /// Move a version to the disabled state.
    async fn disable_version(&self, version_name: &str) -> Result<(), StoreError>;

    /// Delete a secret resource, along with all of its versions.
    async fn delete_secret(&self, secret_name: &str) -> Result<(), StoreError>;
}
