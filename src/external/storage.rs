//! Vault storage collaborator — provisions category folders and mirrors
//! uploaded files to the external storage provider.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;

use crate::config::VaultStorageConfig;
use crate::error::ExternalServiceError;
use crate::onboarding::model::VaultCategory;

/// A folder created by the storage provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProvisionedFolder {
    pub folder_id: String,
}

/// A file mirrored into the storage provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MirroredFile {
    pub file_id: String,
    #[serde(default)]
    pub shared_url: Option<String>,
}

/// External storage operations needed by the onboarding flow.
#[async_trait]
pub trait VaultStorage: Send + Sync {
    /// Create one category folder for a venture.
    async fn create_folder(
        &self,
        venture_name: &str,
        category: VaultCategory,
    ) -> Result<ProvisionedFolder, ExternalServiceError>;

    /// Upload file bytes into an existing folder.
    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MirroredFile, ExternalServiceError>;
}

/// HTTP implementation against the configured storage API.
pub struct HttpVaultStorage {
    config: VaultStorageConfig,
    client: reqwest::Client,
}

impl HttpVaultStorage {
    pub fn new(config: VaultStorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl VaultStorage for HttpVaultStorage {
    async fn create_folder(
        &self,
        venture_name: &str,
        category: VaultCategory,
    ) -> Result<ProvisionedFolder, ExternalServiceError> {
        let body = serde_json::json!({
            "parent": venture_name,
            "name": category.folder_name(),
        });
        let resp = self
            .client
            .post(self.url("folders"))
            .bearer_auth(self.config.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ExternalServiceError::StorageFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ExternalServiceError::StorageFailed {
                reason: format!("folder creation returned {}", resp.status()),
            });
        }
        resp.json()
            .await
            .map_err(|e| ExternalServiceError::InvalidResponse {
                service: "vault-storage",
                reason: e.to_string(),
            })
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MirroredFile, ExternalServiceError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("folder_id", folder_id.to_string())
            .part("file", part);

        let resp = self
            .client
            .post(self.url("files"))
            .bearer_auth(self.config.token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExternalServiceError::StorageFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ExternalServiceError::StorageFailed {
                reason: format!("file upload returned {}", resp.status()),
            });
        }
        resp.json()
            .await
            .map_err(|e| ExternalServiceError::InvalidResponse {
                service: "vault-storage",
                reason: e.to_string(),
            })
    }
}

/// No-op storage used when `PROOFHUB_VAULT_URL` is unset. Every call fails
/// with `StorageDisabled`; callers treat that like any other per-category
/// storage failure (skip and warn).
pub struct DisabledVaultStorage;

#[async_trait]
impl VaultStorage for DisabledVaultStorage {
    async fn create_folder(
        &self,
        _venture_name: &str,
        _category: VaultCategory,
    ) -> Result<ProvisionedFolder, ExternalServiceError> {
        Err(ExternalServiceError::StorageDisabled)
    }

    async fn upload_file(
        &self,
        _folder_id: &str,
        _file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<MirroredFile, ExternalServiceError> {
        Err(ExternalServiceError::StorageDisabled)
    }
}
