// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image hosting client (Cloudinary upload API).
//!
//! Uploads are signed: `signature = sha256_hex("timestamp=<ts>" + api_secret)`.
//! The returned `secure_url` is what gets stored on the user record.

use crate::config::MediaConfig;
use crate::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// An image received from a client, held in memory until uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

/// Upload API response (only the fields we use).
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// Media upload service.
#[derive(Clone)]
pub struct MediaService {
    /// None in mock mode
    http: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl MediaService {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            base_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Create a mock media service for testing (offline mode).
    ///
    /// Uploads succeed without network access and return a URL derived from
    /// the content hash.
    pub fn new_mock() -> Self {
        Self {
            http: None,
            base_url: "https://media.invalid/upload".to_string(),
            api_key: "mock".to_string(),
            api_secret: "mock".to_string(),
        }
    }

    /// Upload an image and return its hosted URL.
    pub async fn upload(&self, file: &UploadFile) -> Result<UploadedMedia, AppError> {
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Uploaded file '{}' is empty",
                file.file_name
            )));
        }

        let Some(http) = self.http.as_ref() else {
            let digest = hex::encode(Sha256::digest(&file.bytes));
            return Ok(UploadedMedia {
                url: format!("{}/{}", self.base_url, digest),
                public_id: digest,
            });
        };

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_upload(&timestamp, &self.api_secret);

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = http
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Media(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Media(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Media(format!("JSON parse error: {}", e)))?;

        tracing::info!(
            public_id = %uploaded.public_id,
            size = file.bytes.len(),
            "Image uploaded"
        );

        Ok(UploadedMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

/// Signature over the (sorted) signed parameters plus the API secret.
fn sign_upload(timestamp: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("timestamp={}", timestamp).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
