//! Media helpers: deciding how to render a URL and uploading local files
//! through the backend's Cloudinary proxy.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::api::media::{ResourceType, UploadedMedia};
use crate::error::{ClientError, ValidationError};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "m4v", "avi", "mkv"];

/// How a portfolio or deliverable URL should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Guess from the file extension, ignoring query and fragment. Anything
    /// not recognised as video renders as an image.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let is_video = extension(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
            || path.contains("/video/upload/");
        if is_video { Self::Video } else { Self::Image }
    }

    #[must_use]
    pub const fn resource_type(self) -> ResourceType {
        match self {
            Self::Image => ResourceType::Image,
            Self::Video => ResourceType::Video,
        }
    }
}

fn extension(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// MIME type for a file name, by extension.
#[must_use]
pub fn mime_type(file_name: &str) -> &'static str {
    match extension(file_name).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// `data:<mime>;base64,<payload>`.
#[must_use]
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Upload a local file through `/api/cloudinary/upload`.
///
/// # Errors
///
/// Returns `EmptyFile` for an empty file, `File` if it cannot be read, or
/// the request error.
#[instrument(skip(api, path), fields(path = %path.as_ref().display()))]
pub async fn upload_file(
    api: &ApiClient,
    path: impl AsRef<Path>,
    folder: Option<&str>,
) -> Result<UploadedMedia, ClientError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile.into());
    }

    let name = path.to_string_lossy();
    let kind = MediaKind::from_url(&name);
    let uri = data_uri(mime_type(&name), &bytes);
    let uploaded = api.upload_data_uri(&uri, folder, kind.resource_type()).await?;
    info!(public_id = %uploaded.public_id, bytes = bytes.len(), "Media uploaded");
    Ok(uploaded)
}
