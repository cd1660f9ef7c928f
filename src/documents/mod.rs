pub mod canvas;
pub mod certificate;
pub mod receipt;

pub use certificate::CertificateData;
pub use receipt::{processing_fee, ReceiptData};

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::utils::AppError;

pub const RECEIPTS_DIR: &str = "receipts";
pub const CERTIFICATES_DIR: &str = "certificates";

/// Generated PDFs on local disk, addressed by paths relative to `root`
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DocumentStore { root: root.into() }
    }

    /// Renders the receipt and returns `receipts/receipt_{id}.pdf`
    pub async fn save_receipt(&self, data: ReceiptData) -> Result<String, AppError> {
        let relative = format!("{}/receipt_{}.pdf", RECEIPTS_DIR, data.payment_id);
        let bytes = render_blocking(move || receipt::render_receipt(&data)).await?;
        self.write(&relative, &bytes).await?;

        log::info!("🧾 Receipt generated: {}", relative);
        Ok(relative)
    }

    /// Renders the certificate and returns `certificates/certificate_{id}.pdf`
    pub async fn save_certificate(&self, data: CertificateData) -> Result<String, AppError> {
        let relative = certificate_path(&data.request_id);
        let bytes = render_blocking(move || certificate::render_certificate(&data)).await?;
        self.write(&relative, &bytes).await?;

        log::info!("📜 Certificate generated: {}", relative);
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(relative)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound("Document file not found".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes next to the target and renames over it, so readers never see a partial file
    async fn write(&self, relative: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut staging = path.clone().into_os_string();
        staging.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let staging = PathBuf::from(staging);

        if let Err(e) = fs::write(&staging, bytes).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Stored paths never leave the documents root
    fn resolve(&self, relative: &str) -> Result<PathBuf, AppError> {
        let candidate = Path::new(relative);
        let escapes = candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AppError::Validation("Invalid document path".into()));
        }
        Ok(self.root.join(candidate))
    }
}

/// Where the certificate for a campaign request is stored
pub fn certificate_path(request_id: &str) -> String {
    format!("{}/certificate_{}.pdf", CERTIFICATES_DIR, request_id)
}

async fn render_blocking<F>(render: F) -> Result<Vec<u8>, AppError>
where
    F: FnOnce() -> Result<Vec<u8>, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| AppError::Document(format!("render task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> DocumentStore {
        DocumentStore::new(std::env::temp_dir().join(format!("fundrise-docs-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = store();
        assert!(store.resolve("receipts/receipt_1.pdf").is_ok());
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_save_and_read_receipt() {
        let store = store();
        let relative = store
            .save_receipt(ReceiptData {
                payment_id: "abc123".into(),
                backer_name: "Kiran".into(),
                backer_email: "kiran@example.com".into(),
                project_title: "Library".into(),
                amount: 250.0,
                transaction_id: "cs_test_1".into(),
                issued_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(relative, "receipts/receipt_abc123.pdf");
        let bytes = store.read(&relative).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_rewriting_a_document_replaces_it_without_leftovers() {
        let store = store();
        store.write("certificates/certificate_x.pdf", b"first").await.unwrap();
        store.write("certificates/certificate_x.pdf", b"second").await.unwrap();

        assert_eq!(store.read("certificates/certificate_x.pdf").await.unwrap(), b"second");

        let mut entries = fs::read_dir(store.root.join(CERTIFICATES_DIR)).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["certificate_x.pdf".to_string()]);
    }

    #[test]
    fn test_certificate_path_is_keyed_by_request() {
        assert_eq!(certificate_path("abc"), "certificates/certificate_abc.pdf");
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let err = store().read("certificates/certificate_none.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
