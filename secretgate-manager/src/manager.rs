//! Secret lifecycle manager
//!
//! Translates short secret names into backend operations, resolves the
//! current value across the version history, and caches resolved secrets
//! by canonical resource name.

use bytes::Bytes;
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::store::{Replication, SecretStore, StoreError, VersionState};

/// Errors surfaced by manager operations.
///
/// Not-found is kept distinct from other backend failures so the transport
/// layer can map the two to different status codes.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Backend rejected the request: {0}")]
    Backend(#[source] StoreError),
}

impl From<StoreError> for ManagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Backend(other),
        }
    }
}

/// A resolved secret
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Short, user-facing name (unique within the project)
    pub name: String,
    /// Current plaintext payload; absent when no enabled version exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Canonical resource path; stable for the secret's lifetime
    pub canonical_name: String,
    /// Canonical path of the version currently considered live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
}

/// Secret lifecycle manager.
///
/// Holds the store handle, the fixed project prefix, and the cache. The
/// cache maps canonical name to the last resolved [`Secret`]; it is
/// unbounded and lives for the process, so it grows with the number of
/// distinct secrets touched. Concurrent requests may race on an entry;
/// last writer wins, which is benign because entries are only ever
/// replaced with fresher resolutions of the same secret.
pub struct SecretManager {
    store: Arc<dyn SecretStore>,
    project: String,
    cache: DashMap<String, Secret>,
}

impl SecretManager {
    pub fn new(project_id: &str, store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            project: format!("projects/{project_id}"),
            cache: DashMap::new(),
        }
    }

    /// The project scope (`projects/{id}`) this manager serves.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// List every secret in the project, resolving each one's current
    /// value through the same path as [`get`](Self::get).
    ///
    /// The enumeration itself is all-or-nothing. A failure resolving one
    /// secret's value is returned in place rather than aborting the whole
    /// list, so callers can record each failure and render a hole.
    pub async fn list(&self) -> Result<Vec<Result<Secret, ManagerError>>, ManagerError> {
        let secrets = self.store.list_secrets(&self.project).await?;
        Ok(join_all(secrets.iter().map(|info| self.fetch(&info.name))).await)
    }

    /// Resolve a secret by its short name.
    pub async fn get(&self, name: &str) -> Result<Secret, ManagerError> {
        let canonical = format!("{}/secrets/{name}", self.project);
        self.fetch(&canonical).await
    }

    /// Resolve a secret the caller has already addressed canonically.
    pub async fn get_canonical(&self, canonical: &str) -> Result<Secret, ManagerError> {
        self.fetch(canonical).await
    }

    /// Create a secret resource and add one version carrying `value`.
    ///
    /// The replication policy is fixed to automatic placement.
    pub async fn create(&self, name: &str, value: &str) -> Result<Secret, ManagerError> {
        let info = self
            .store
            .create_secret(&self.project, name, Replication::Automatic)
            .await?;
        let version = self
            .store
            .add_version(&info.name, Bytes::copy_from_slice(value.as_bytes()))
            .await?;

        Ok(self.remember(name, value, info.name, version.name))
    }

    /// Add a new version carrying `value` and disable the previous current
    /// version, so exactly one version stays enabled.
    ///
    /// Fails if the secret does not exist.
    pub async fn update(&self, name: &str, value: &str) -> Result<Secret, ManagerError> {
        let existing = self.get(name).await?;

        let version = self
            .store
            .add_version(
                &existing.canonical_name,
                Bytes::copy_from_slice(value.as_bytes()),
            )
            .await?;

        // A secret created out-of-band may have had no live version to retire
        if let Some(previous) = &existing.current_version {
            self.store.disable_version(previous).await?;
        }

        Ok(self.remember(name, value, existing.canonical_name, version.name))
    }

    /// Delete a secret resource. Resolves the secret first to validate
    /// existence, then evicts the cache entry so later reads cannot serve
    /// the deleted value.
    pub async fn delete(&self, name: &str) -> Result<(), ManagerError> {
        let existing = self.get(name).await?;
        self.store.delete_secret(&existing.canonical_name).await?;
        self.cache.remove(&existing.canonical_name);
        Ok(())
    }

    /// Resolve a canonical name to a full secret, read-through cached.
    ///
    /// On a miss: list the secret's versions, take the first enabled one
    /// (the store reports newest first; no explicit sort), fetch and decode
    /// its payload. A secret with zero enabled versions resolves to a
    /// value-less entry, which is still cached.
    async fn fetch(&self, canonical: &str) -> Result<Secret, ManagerError> {
        if let Some(hit) = self.cache.get(canonical) {
            return Ok(hit.clone());
        }

        let name = short_name(canonical);
        let versions = self.store.list_versions(canonical).await?;
        let current = versions
            .into_iter()
            .find(|v| v.state == VersionState::Enabled);

        let secret = match current {
            None => Secret {
                name,
                value: None,
                canonical_name: canonical.to_string(),
                current_version: None,
            },
            Some(version) => {
                let payload = self.store.access_version(&version.name).await?;
                Secret {
                    name,
                    value: Some(String::from_utf8_lossy(&payload).into_owned()),
                    canonical_name: canonical.to_string(),
                    current_version: Some(version.name),
                }
            }
        };

        debug!(secret = canonical, "resolved secret from store");
        self.cache.insert(canonical.to_string(), secret.clone());
        Ok(secret)
    }

    fn remember(&self, name: &str, value: &str, canonical: String, version: String) -> Secret {
        let secret = Secret {
            name: name.to_string(),
            value: Some(value.to_string()),
            canonical_name: canonical.clone(),
            current_version: Some(version),
        };
        self.cache.insert(canonical, secret.clone());
        secret
    }
}

/// Last path segment of a canonical resource name.
fn short_name(canonical: &str) -> String {
    canonical
        .rsplit('/')
        .next()
        .unwrap_or(canonical)
        .to_string()
}
