use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, header};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::errors::ProviderError;
use super::ImageToTextConverter;
use super::credentials::{OAuthToken, TokenProvider};

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
/// Importing an image as this type makes Drive run OCR on it
const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
const MULTIPART_BOUNDARY: &str = "ocrsrt_multipart_boundary_7f3a9c";

/// Drive file resource, reduced to the fields requested
#[derive(Debug, Deserialize)]
pub struct DriveFile {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// OCR through Google Drive: the image is imported as a Google Doc inside a
/// scratch folder, exported as plain text, and the document deleted again.
pub struct DriveOcr {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    cached_token: Mutex<Option<OAuthToken>>,
    folder_id: String,
    api_base: String,
    upload_base: String,
}

impl std::fmt::Debug for DriveOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveOcr")
            .field("folder_id", &self.folder_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl DriveOcr {
    /// Authenticate and resolve (or create) the scratch folder
    pub async fn connect(
        tokens: Arc<dyn TokenProvider>,
        folder_name: &str,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        Self::connect_with_endpoints(tokens, folder_name, timeout_secs, DRIVE_API, DRIVE_UPLOAD_API).await
    }

    /// Same as `connect`, against non-default API roots
    pub async fn connect_with_endpoints(
        tokens: Arc<dyn TokenProvider>,
        folder_name: &str,
        timeout_secs: u64,
        api_base: &str,
        upload_base: &str,
    ) -> Result<Self, ProviderError> {
        let mut drive = Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            tokens,
            cached_token: Mutex::new(None),
            folder_id: String::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        };

        drive.folder_id = drive.get_or_create_folder(folder_name).await?;
        Ok(drive)
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    async fn authorization(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.authorization());
            }
        }

        let token = self.tokens.acquire().await?;
        let value = token.authorization();
        *cached = Some(token);
        Ok(value)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("Drive API error while trying to {} ({}): {}", action, status, body);
        Err(ProviderError::from_status(status.as_u16(), format!("{}: {}", action, body)))
    }

    /// Find the folder by name, creating it when missing
    async fn get_or_create_folder(&self, folder_name: &str) -> Result<String, ProviderError> {
        let escaped = folder_name.replace('\\', "\\\\").replace('\'', "\\'");
        let query = format!(
            "mimeType='{}' and name='{}' and trashed=false",
            FOLDER_MIME, escaped
        );

        let response = self.client.get(format!("{}/files", self.api_base))
            .header(header::AUTHORIZATION, self.authorization().await?)
            .query(&[("q", query.as_str()), ("pageSize", "1"), ("fields", "files(id)")])
            .send()
            .await?;
        let list: FileList = Self::check(response, "search folder").await?
            .json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(folder) = list.files.into_iter().next() {
            info!("Found Drive scratch folder '{}' (ID: {})", folder_name, folder.id);
            return Ok(folder.id);
        }

        info!("Creating Drive scratch folder '{}'", folder_name);
        let response = self.client.post(format!("{}/files", self.api_base))
            .header(header::AUTHORIZATION, self.authorization().await?)
            .query(&[("fields", "id")])
            .json(&serde_json::json!({ "name": folder_name, "mimeType": FOLDER_MIME }))
            .send()
            .await?;
        let folder: DriveFile = Self::check(response, "create folder").await?
            .json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(folder.id)
    }

    /// Upload the image as a Google Doc, which triggers OCR
    async fn create_document(&self, source_name: &str, image: Vec<u8>) -> Result<DriveFile, ProviderError> {
        let doc_name = Path::new(source_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_name.to_string());

        let metadata = serde_json::json!({
            "name": doc_name,
            "parents": [self.folder_id],
            "mimeType": DOCUMENT_MIME,
        });
        let body = multipart_related(&metadata.to_string(), image_mime_type(source_name), &image);

        let response = self.client.post(format!("{}/files", self.upload_base))
            .header(header::AUTHORIZATION, self.authorization().await?)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .body(body)
            .send()
            .await?;

        Self::check(response, "create OCR document").await?
            .json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn export_text(&self, file_id: &str) -> Result<String, ProviderError> {
        let response = self.client.get(format!("{}/files/{}/export", self.api_base, file_id))
            .header(header::AUTHORIZATION, self.authorization().await?)
            .query(&[("mimeType", "text/plain")])
            .send()
            .await?;

        Self::check(response, "export document text").await?
            .text().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), ProviderError> {
        let response = self.client.delete(format!("{}/files/{}", self.api_base, file_id))
            .header(header::AUTHORIZATION, self.authorization().await?)
            .send()
            .await?;
        Self::check(response, "delete temporary document").await?;
        Ok(())
    }
}

#[async_trait]
impl ImageToTextConverter for DriveOcr {
    async fn convert(&self, source_name: &str, image: Vec<u8>) -> Result<String, ProviderError> {
        debug!("Creating OCR document for {}", source_name);
        let doc = self.create_document(source_name, image).await?;

        debug!("Exporting text for {} (document {})", source_name, doc.id);
        let text = self.export_text(&doc.id).await;

        // The document is deleted whether or not the export worked
        if let Err(e) = self.delete_file(&doc.id).await {
            error!("Failed to delete temporary document {}: {}", doc.id, e);
        }

        text
    }
}

/// MIME type of an image, from its extension
pub fn image_mime_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Build a `multipart/related` body: JSON metadata part, then the media part
fn multipart_related(metadata: &str, media_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            m = metadata,
            t = media_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
