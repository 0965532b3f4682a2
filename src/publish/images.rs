//! Image hosting: where decoded attachments get a durable URL.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::ImagesConfig;
use crate::error::{MailError, Result};

/// Something that stores image bytes and hands back a URL for them.
pub trait ImageHost {
    /// Store `data` under a name derived from `filename` and return its URL.
    ///
    /// Uploading the same bytes twice must be harmless.
    fn upload(&self, filename: &str, data: &[u8]) -> Result<String>;
}

/// An [`ImageHost`] backed by a local directory served under `base_url`.
///
/// Files are named by content hash plus the sanitized filename, so a retry
/// rewrites the same file instead of creating a duplicate.
#[derive(Debug, Clone)]
pub struct DirectoryImageHost {
    dir: PathBuf,
    base_url: String,
}

impl DirectoryImageHost {
    /// Create the host, creating `dir` if needed.
    ///
    /// Without a `base_url` the directory's `file://` URL is used.
    pub fn new(dir: impl Into<PathBuf>, base_url: Option<String>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| MailError::io(&dir, e))?;
        let base_url = base_url.unwrap_or_else(|| format!("file://{}", dir.display()));
        Ok(Self {
            dir,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ImagesConfig) -> Result<Self> {
        let dir = config
            .output_dir
            .clone()
            .ok_or_else(|| MailError::MissingConfig("images.output_dir".into()))?;
        Self::new(dir, config.base_url.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageHost for DirectoryImageHost {
    fn upload(&self, filename: &str, data: &[u8]) -> Result<String> {
        let name = hosted_name(filename, data);
        let path = self.dir.join(&name);
        std::fs::write(&path, data).map_err(|e| MailError::Upload {
            filename: filename.to_string(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), size = data.len(), "Stored image");
        Ok(format!("{}/{}", self.base_url, name))
    }
}

/// `{first 12 hex digits of sha256}_{sanitized filename}`.
fn hosted_name(filename: &str, data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let prefix: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("{prefix}_{}", sanitize_filename_part(filename, 100))
}

/// Sanitize a string for use in filenames and URLs.
///
/// Replaces everything outside `[A-Za-z0-9._@-]` with `_` and truncates to
/// `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world.png", 20), "hello_world.png");
        assert_eq!(sanitize_filename_part("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename_part("../../etc/passwd", 40), ".._.._etc_passwd");
        assert_eq!(sanitize_filename_part("", 20), "unknown");
        assert_eq!(sanitize_filename_part("foto_año.jpg", 40), "foto_a_o.jpg");
    }

    #[test]
    fn test_hosted_name_is_content_addressed() {
        let a = hosted_name("x.png", b"one");
        assert_eq!(a, hosted_name("x.png", b"one"));
        assert_ne!(a, hosted_name("x.png", b"two"));
        assert!(a.ends_with("_x.png"));
        assert_eq!(a.len(), 12 + 1 + "x.png".len());
    }

    #[test]
    fn test_upload_returns_url_under_base() {
        let dir = tempfile::tempdir().unwrap();
        let host =
            DirectoryImageHost::new(dir.path(), Some("https://img.example/".to_string())).unwrap();
        let url = host.upload("my logo.png", b"\x89PNG").unwrap();
        assert!(url.starts_with("https://img.example/"));
        assert!(url.ends_with("_my_logo.png"));

        let again = host.upload("my logo.png", b"\x89PNG").unwrap();
        assert_eq!(url, again);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
