//! In-memory versioned secret store

use super::traits::*;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// A stored version
#[derive(Debug, Clone)]
struct StoredVersion {
    name: String,
    payload: Bytes,
    state: VersionState,
    create_time: DateTime<Utc>,
}

/// A stored secret with its append-only version log
#[derive(Debug)]
struct StoredSecret {
    /// Versions in creation order; version `n` lives at index `n - 1`
    versions: Vec<StoredVersion>,
    create_time: DateTime<Utc>,
}

/// In-memory secret store.
///
/// Secrets are indexed by canonical path and safe for concurrent use.
/// Intended for tests and local runs; anything durable lives behind a
/// different [`SecretStore`] binding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: DashMap<String, StoredSecret>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            secrets: DashMap::new(),
        }
    }
}

/// Secret ids are restricted to 255 chars of `[A-Za-z0-9_-]`.
fn validate_secret_id(secret_id: &str) -> Result<(), StoreError> {
    if secret_id.is_empty() || secret_id.len() > 255 {
        return Err(StoreError::InvalidArgument(format!(
            "Secret id must be 1-255 characters: {secret_id:?}"
        )));
    }
    if !secret_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::InvalidArgument(format!(
            "Secret id contains invalid characters: {secret_id:?}"
        )));
    }
    Ok(())
}

/// Split a canonical version path into its secret path and version number.
fn split_version_name(version_name: &str) -> Result<(&str, usize), StoreError> {
    version_name
        .rsplit_once("/versions/")
        .and_then(|(secret, n)| n.parse::<usize>().ok().map(|n| (secret, n)))
        .ok_or_else(|| StoreError::InvalidArgument(format!("Not a version path: {version_name}")))
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn list_secrets(&self, parent: &str) -> Result<Vec<SecretInfo>, StoreError> {
        let prefix = format!("{parent}/secrets/");
        let mut secrets: Vec<SecretInfo> = self
            .secrets
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| SecretInfo {
                name: entry.key().clone(),
                create_time: entry.value().create_time,
            })
            .collect();
        // DashMap iteration order is arbitrary; enumeration is by name
        secrets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(secrets)
    }

    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
        _replication: Replication,
    ) -> Result<SecretInfo, StoreError> {
        validate_secret_id(secret_id)?;

        let name = format!("{parent}/secrets/{secret_id}");
        if self.secrets.contains_key(&name) {
            return Err(StoreError::AlreadyExists(name));
        }

        let secret = StoredSecret {
            versions: Vec::new(),
            create_time: Utc::now(),
        };
        let info = SecretInfo {
            name: name.clone(),
            create_time: secret.create_time,
        };
        self.secrets.insert(name, secret);
        Ok(info)
    }

    async fn add_version(
        &self,
        secret_name: &str,
        payload: Bytes,
    ) -> Result<VersionInfo, StoreError> {
        let mut secret = self
            .secrets
            .get_mut(secret_name)
            .ok_or_else(|| StoreError::NotFound(secret_name.to_string()))?;

        let version = StoredVersion {
            name: format!("{}/versions/{}", secret_name, secret.versions.len() + 1),
            payload,
            state: VersionState::Enabled,
            create_time: Utc::now(),
        };
        let info = VersionInfo {
            name: version.name.clone(),
            state: version.state,
            create_time: version.create_time,
        };
        secret.versions.push(version);
        Ok(info)
    }

    async fn list_versions(&self, secret_name: &str) -> Result<Vec<VersionInfo>, StoreError> {
        let secret = self
            .secrets
            .get(secret_name)
            .ok_or_else(|| StoreError::NotFound(secret_name.to_string()))?;

        Ok(secret
            .versions
            .iter()
            .rev()
            .map(|v| VersionInfo {
                name: v.name.clone(),
                state: v.state,
                create_time: v.create_time,
            })
            .collect())
    }

    async fn access_version(&self, version_name: &str) -> Result<Bytes, StoreError> {
        let (secret_name, number) = split_version_name(version_name)?;
        let secret = self
            .secrets
            .get(secret_name)
            .ok_or_else(|| StoreError::NotFound(secret_name.to_string()))?;

        secret
            .versions
            .get(number.wrapping_sub(1))
            .map(|v| v.payload.clone())
            .ok_or_else(|| StoreError::NotFound(version_name.to_string()))
    }

    async fn disable_version(&self, version_name: &str) -> Result<(), StoreError> {
        let (secret_name, number) = split_version_name(version_name)?;
        let mut secret = self
            .secrets
            .get_mut(secret_name)
            .ok_or_else(|| StoreError::NotFound(secret_name.to_string()))?;

        let version = secret
            .versions
            .get_mut(number.wrapping_sub(1))
            .ok_or_else(|| StoreError::NotFound(version_name.to_string()))?;
        version.state = VersionState::Disabled;
        Ok(())
    }

    async fn delete_secret(&self, secret_name: &str) -> Result<(), StoreError> {
        self.secrets
            .remove(secret_name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(secret_name.to_string()))
    }
}
