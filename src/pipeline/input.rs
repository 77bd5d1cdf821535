//! Input validation: decide whether an upload is an image we can analyse.
//!
//! The web form only offers PNG / JPG / JPEG, but browsers do not enforce
//! `accept=` and the CLI takes arbitrary paths. We check, in order: the body
//! is non-empty, it fits the size limit, the extension is supported, and the
//! first bytes really are a PNG or JPEG signature. A file whose extension and
//! signature disagree is decoded according to its signature.

use crate::error::KpiLensError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// An image as received from the browser or read from disk.
#[derive(Debug, Clone)]
pub struct DashboardUpload {
    /// Original file name, used for the extension check and the report name.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DashboardUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Supported image containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Classify by file extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    /// Classify by signature bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(ImageKind::Jpeg)
        } else {
            None
        }
    }

    pub fn format(self) -> image::ImageFormat {
        match self {
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImageKind::Png => "PNG",
            ImageKind::Jpeg => "JPEG",
        }
    }
}

/// Validate an upload and return the kind its bytes should be decoded as.
pub fn validate_upload(
    upload: &DashboardUpload,
    max_bytes: usize,
) -> Result<ImageKind, KpiLensError> {
    if upload.bytes.is_empty() {
        return Err(KpiLensError::EmptyImage {
            filename: upload.filename.clone(),
        });
    }
    if upload.bytes.len() > max_bytes {
        return Err(KpiLensError::UploadTooLarge {
            size: upload.bytes.len(),
            limit: max_bytes,
        });
    }

    let declared = ImageKind::from_filename(&upload.filename).ok_or_else(|| {
        KpiLensError::UnsupportedImageType {
            filename: upload.filename.clone(),
        }
    })?;

    let detected = ImageKind::sniff(&upload.bytes).ok_or_else(|| {
        KpiLensError::ImageDecodeFailed {
            filename: upload.filename.clone(),
            detail: format!(
                "file does not start with a {} signature",
                declared.label()
            ),
        }
    })?;

    if detected != declared {
        debug!(
            "'{}' is named as {} but contains {}",
            upload.filename,
            declared.label(),
            detected.label()
        );
    }
    Ok(detected)
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load an image from a local path or an HTTP(S) URL.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<DashboardUpload, KpiLensError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<DashboardUpload, KpiLensError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(KpiLensError::PermissionDenied { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(KpiLensError::FileNotFound { path });
        }
        Err(e) => return Err(KpiLensError::FileReadFailed { path, source: e }),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(DashboardUpload { filename, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<DashboardUpload, KpiLensError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| KpiLensError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            KpiLensError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            KpiLensError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(KpiLensError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| KpiLensError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(DashboardUpload {
        filename: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last path segment of the URL when it has an extension, else `dashboard.png`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "dashboard.png".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let mut b = PNG_MAGIC.to_vec();
        b.extend_from_slice(&[0u8; 16]);
        b
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/kpi.png"));
        assert!(is_url("http://example.com/kpi.png"));
        assert!(!is_url("/tmp/kpi.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn extension_classification() {
        assert_eq!(ImageKind::from_filename("a.PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_filename("a.jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_filename("a.JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_filename("a.gif"), None);
        assert_eq!(ImageKind::from_filename("noext"), None);
    }

    #[test]
    fn rejects_unsupported_extension() {
        let upload = DashboardUpload::new("report.pdf", b"%PDF-1.7".to_vec());
        let err = validate_upload(&upload, 1024).unwrap_err();
        assert!(matches!(err, KpiLensError::UnsupportedImageType { .. }));
    }

    #[test]
    fn rejects_empty_and_oversize() {
        let empty = DashboardUpload::new("a.png", Vec::new());
        assert!(matches!(
            validate_upload(&empty, 1024),
            Err(KpiLensError::EmptyImage { .. })
        ));

        let big = DashboardUpload::new("a.png", png_bytes());
        assert!(matches!(
            validate_upload(&big, 4),
            Err(KpiLensError::UploadTooLarge { limit: 4, .. })
        ));
    }

    #[test]
    fn rejects_garbage_with_valid_extension() {
        let upload = DashboardUpload::new("chart.jpg", b"not an image at all".to_vec());
        assert!(matches!(
            validate_upload(&upload, 1024),
            Err(KpiLensError::ImageDecodeFailed { .. })
        ));
    }

    #[test]
    fn signature_wins_over_extension() {
        let upload = DashboardUpload::new("chart.jpg", png_bytes());
        assert_eq!(validate_upload(&upload, 1024).unwrap(), ImageKind::Png);
    }

    #[test]
    fn url_filename() {
        assert_eq!(filename_from_url("https://x.io/a/b/sales.jpeg"), "sales.jpeg");
        assert_eq!(filename_from_url("https://x.io/render"), "dashboard.png");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, KpiLensError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn directory_is_a_read_failure_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, KpiLensError::FileReadFailed { .. }), "got {err:?}");
        assert!(err.is_client_error());
    }
}
