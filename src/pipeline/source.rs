//! Input resolution: load a score from a local path or an HTTP(S) URL.
//!
//! pdfium is fed from memory, so both kinds of input end up as a byte
//! buffer. The `%PDF` magic is checked here so callers get a readable error
//! instead of a pdfium parse failure.

use crate::error::LyricsError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A loaded PDF plus a display name for logs and error messages.
#[derive(Debug, Clone)]
pub struct PdfSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input string as PDF bytes.
pub async fn load_pdf(input: &str, timeout_secs: u64) -> Result<PdfSource, LyricsError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Fail unless `bytes` start with the PDF magic.
pub fn check_pdf_magic(name: &str, bytes: &[u8]) -> Result<(), LyricsError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(LyricsError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

async fn read_local(path_str: &str) -> Result<PdfSource, LyricsError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LyricsError::PermissionDenied { path });
        }
        Err(_) => return Err(LyricsError::FileNotFound { path }),
    };

    check_pdf_magic(path_str, &bytes)?;
    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());

    Ok(PdfSource {
        name: path_str.to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfSource, LyricsError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LyricsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            LyricsError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            LyricsError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(LyricsError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| LyricsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    check_pdf_magic(url, &bytes)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(PdfSource {
        name: url.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/score.pdf"));
        assert!(is_url("http://example.com/score.pdf"));
        assert!(!is_url("/tmp/score.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_check() {
        assert!(check_pdf_magic("a.pdf", b"%PDF-1.7\n").is_ok());
        let err = check_pdf_magic("a.png", b"\x89PNG\r\n").unwrap_err();
        assert!(matches!(err, LyricsError::NotAPdf { ref magic, .. } if magic.len() == 4));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = load_pdf("/definitely/not/a/score.pdf", 5).await.unwrap_err();
        assert!(matches!(err, LyricsError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"hello world").unwrap();
        let err = load_pdf(tmp.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, LyricsError::NotAPdf { .. }));
    }
}
