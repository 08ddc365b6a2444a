//! Cloudinary proxy endpoints.
//!
//! The backend signs uploads and can proxy small files; the API secret never
//! reaches the client.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiClient;
use crate::error::ClientError;

/// Cloudinary resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[default]
    Image,
    Video,
    /// Let Cloudinary detect the type.
    Auto,
}

#[derive(Debug, Serialize)]
struct SignatureRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    folder: Option<&'a str>,
    resource_type: ResourceType,
}

/// Signed parameters for a direct upload to Cloudinary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadSignature {
    pub signature: String,
    pub timestamp: i64,
    pub api_key: String,
    pub cloud_name: String,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    /// `data:<mime>;base64,<payload>`.
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder: Option<&'a str>,
    resource_type: ResourceType,
}

/// An uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    #[serde(alias = "url")]
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Whether uploads are configured on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MediaStatus {
    #[serde(default)]
    pub configured: bool,
    #[serde(default)]
    pub cloud_name: Option<String>,
}

impl ApiClient {
    /// `POST /api/cloudinary/signature`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn upload_signature(
        &self,
        folder: Option<&str>,
        resource_type: ResourceType,
    ) -> Result<UploadSignature, ClientError> {
        self.post(
            "/api/cloudinary/signature",
            &SignatureRequest {
                folder,
                resource_type,
            },
        )
        .await
    }

    /// `POST /api/cloudinary/upload` with a base64 data URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the upload is rejected.
    #[instrument(skip(self, data_uri), fields(len = data_uri.len()))]
    pub async fn upload_data_uri(
        &self,
        data_uri: &str,
        folder: Option<&str>,
        resource_type: ResourceType,
    ) -> Result<UploadedMedia, ClientError> {
        self.post(
            "/api/cloudinary/upload",
            &UploadRequest {
                file: data_uri,
                folder,
                resource_type,
            },
        )
        .await
    }

    /// `GET /api/cloudinary/status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn media_status(&self) -> Result<MediaStatus, ClientError> {
        self.get("/api/cloudinary/status").await
    }
}
