use actix_multipart::Multipart;
use futures::TryStreamExt;

use crate::{
    cloudinary::{CloudinaryClient, UploadedImage},
    config::AppConfig,
    utils::AppError,
};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_FILES: usize = 5;
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// A file field read fully into memory
#[derive(Debug)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// MIME type sent to Cloudinary, derived from the extension when the client gave none
    fn mime(&self) -> String {
        match &self.content_type {
            Some(ct) if ct.starts_with("image/") => ct.clone(),
            _ => match self.extension().as_deref() {
                Some("jpg") | Some("jpeg") => "image/jpeg".into(),
                Some(ext) => format!("image/{}", ext),
                None => "application/octet-stream".into(),
            },
        }
    }
}

fn allowed_content_type(content_type: &str) -> bool {
    content_type
        .strip_prefix("image/")
        .map(|sub| ALLOWED_EXTENSIONS.contains(&sub))
        .unwrap_or(false)
}

pub fn validate_image(file: &IncomingFile) -> Result<(), AppError> {
    if file.bytes.is_empty() {
        return Err(AppError::Validation("No file uploaded".into()));
    }
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation("File too large. Maximum size is 10MB".into()));
    }

    let by_extension = file
        .extension()
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    let by_type = file.content_type.as_deref().map(allowed_content_type).unwrap_or(false);

    if !by_extension && !by_type {
        return Err(AppError::Validation(format!(
            "Invalid file type for {}. Allowed formats: {}",
            file.filename,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

/// Reads up to `max_files` parts named `field`; other parts are drained and skipped
pub async fn collect_files(
    mut payload: Multipart,
    field_name: &str,
    max_files: usize,
) -> Result<Vec<IncomingFile>, AppError> {
    let bad = |e: actix_multipart::MultipartError| AppError::Validation(e.to_string());
    let mut files = Vec::new();

    while let Some(mut field) = payload.try_next().await.map_err(bad)? {
        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };

        let Some(filename) = filename.filter(|_| name == field_name) else {
            while field.try_next().await.map_err(bad)?.is_some() {}
            continue;
        };

        if files.len() >= max_files {
            return Err(AppError::Validation(format!(
                "Too many files. Maximum is {}",
                max_files
            )));
        }

        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad)? {
            if bytes.len() + chunk.len() > MAX_FILE_SIZE {
                return Err(AppError::Validation("File too large. Maximum size is 10MB".into()));
            }
            bytes.extend_from_slice(&chunk);
        }

        files.push(IncomingFile {
            filename,
            content_type,
            bytes,
        });
    }

    Ok(files)
}

async fn upload_all(config: &AppConfig, files: Vec<IncomingFile>) -> Result<Vec<UploadedImage>, AppError> {
    if files.is_empty() {
        return Err(AppError::Validation("No file uploaded".into()));
    }
    for file in &files {
        validate_image(file)?;
    }

    let client = CloudinaryClient::from_settings(&config.cloudinary)?;
    let timestamp = chrono::Utc::now().timestamp();

    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        let mime = file.mime();
        uploaded.push(client.upload(file.bytes, &file.filename, &mime, timestamp).await?);
    }
    Ok(uploaded)
}

pub async fn upload_image(config: &AppConfig, payload: Multipart) -> Result<UploadedImage, AppError> {
    let files = collect_files(payload, "image", 1).await?;
    upload_all(config, files)
        .await?
        .pop()
        .ok_or_else(|| AppError::Validation("No file uploaded".into()))
}

pub async fn upload_images(config: &AppConfig, payload: Multipart) -> Result<Vec<UploadedImage>, AppError> {
    let files = collect_files(payload, "images", MAX_FILES).await?;
    let uploaded = upload_all(config, files).await?;
    log::info!("✅ {} files uploaded to Cloudinary", uploaded.len());
    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: Option<&str>, len: usize) -> IncomingFile {
        IncomingFile {
            filename: name.into(),
            content_type: content_type.map(str::to_string),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_accepts_known_image_formats() {
        assert!(validate_image(&file("cover.JPG", None, 10)).is_ok());
        assert!(validate_image(&file("banner.webp", Some("image/webp"), 10)).is_ok());
        assert!(validate_image(&file("blob", Some("image/png"), 10)).is_ok());
    }

    #[test]
    fn test_rejects_other_types() {
        assert!(validate_image(&file("notes.pdf", Some("application/pdf"), 10)).is_err());
        assert!(validate_image(&file("vector.svg", Some("image/svg+xml"), 10)).is_err());
    }

    #[test]
    fn test_size_limits() {
        assert!(validate_image(&file("big.png", None, MAX_FILE_SIZE)).is_ok());
        let err = validate_image(&file("huge.png", None, MAX_FILE_SIZE + 1)).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 10MB");
        assert_eq!(
            validate_image(&file("empty.png", None, 0)).unwrap_err().to_string(),
            "No file uploaded"
        );
    }

    #[test]
    fn test_mime_falls_back_to_extension() {
        assert_eq!(file("a.jpg", None, 1).mime(), "image/jpeg");
        assert_eq!(file("a.gif", Some("application/octet-stream"), 1).mime(), "image/gif");
        assert_eq!(file("a.png", Some("image/png"), 1).mime(), "image/png");
    }

    #[tokio::test]
    async fn test_nothing_to_upload() {
        let config = crate::config::test_config();
        let err = upload_all(&config, vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "No file uploaded");
    }
}
