//! Signed image uploads to Cloudinary's REST upload endpoint.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::config::CloudinarySettings;
use crate::utils::AppError;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub const UPLOAD_FOLDER: &str = "crowdfunding-projects";
pub const TRANSFORMATION: &str = "c_limit,w_1200,h_800";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
    pub filename: String,
}

/// `sha1("k1=v1&k2=v2" + secret)` over the params sorted by key
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct CloudinaryClient {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn from_settings(settings: &CloudinarySettings) -> Result<Self, AppError> {
        match (&settings.cloud_name, &settings.api_key, &settings.api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Self {
                http: reqwest::Client::new(),
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => Err(AppError::Cloudinary("Image storage is not configured".into())),
        }
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        timestamp: i64,
    ) -> Result<UploadedImage, AppError> {
        let params = [
            ("folder", UPLOAD_FOLDER.to_string()),
            ("timestamp", timestamp.to_string()),
            ("transformation", TRANSFORMATION.to_string()),
        ];
        let signature = sign(&params, &self.api_secret);

        let file = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::Cloudinary(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        log::info!("📤 Uploading {} to Cloudinary", filename);

        let response = self
            .http
            .post(format!("{}/{}/image/upload", API_BASE, self.cloud_name))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Cloudinary(format!("Failed to reach Cloudinary: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Cloudinary(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("Cloudinary returned {}", status));
            log::error!("❌ Cloudinary upload failed: {}", message);
            return Err(AppError::Cloudinary(message));
        }

        let uploaded: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Cloudinary(format!("Unexpected Cloudinary response: {}", e)))?;

        log::info!("✅ Uploaded to Cloudinary: {}", uploaded.public_id);

        Ok(UploadedImage {
            url: uploaded.secure_url,
            filename: uploaded.public_id.clone(),
            public_id: uploaded.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_documented_example() {
        // Example from Cloudinary's "generating authentication signatures" guide
        let params = [
            ("timestamp", "1315060510".to_string()),
            ("public_id", "sample_image".to_string()),
            ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string()),
        ];
        assert_eq!(
            sign(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn test_signature_ignores_param_order_and_empty_values() {
        let a = [("timestamp", "1".to_string()), ("folder", "f".to_string())];
        let b = [
            ("folder", "f".to_string()),
            ("timestamp", "1".to_string()),
            ("tags", String::new()),
        ];
        assert_eq!(sign(&a, "s"), sign(&b, "s"));
        assert_ne!(sign(&a, "s"), sign(&a, "t"));
    }

    #[test]
    fn test_missing_credentials() {
        let settings = CloudinarySettings {
            cloud_name: Some("demo".into()),
            api_key: None,
            api_secret: Some("secret".into()),
        };
        assert!(CloudinaryClient::from_settings(&settings).is_err());
    }
}
