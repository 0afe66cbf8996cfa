//! pinup test utilities.
//!
//! Helpers for integration testing: a multipart body builder and a
//! throwaway public directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Boundary used by [`MultipartForm`].
pub const BOUNDARY: &str = "----PinupTestBoundary7MA4YWxkTrZu0gW";

/// A multipart/form-data body builder.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    /// Start an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Add a file field.
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the request's `content-type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    /// Finish the body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Deterministic test payload of `len` bytes.
pub fn image_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A temporary public directory, removed on drop.
#[derive(Debug)]
pub struct TestPublicDir {
    dir: TempDir,
}

impl TestPublicDir {
    /// Create an empty public directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp public dir"),
        }
    }

    /// Root of the public directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Default upload directory inside it.
    pub fn uploads(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Names of the files currently in the upload directory, sorted.
    pub fn uploaded_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.uploads()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for TestPublicDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_layout() {
        let form = MultipartForm::new().text("pinCode", "12345");
        let form = form.file("imageFile", "a.jpg", "image/jpeg", b"abc");
        let content_type = form.content_type();
        let body = String::from_utf8(form.finish()).unwrap();

        assert!(content_type.ends_with(BOUNDARY));
        assert!(body.contains("name=\"pinCode\"\r\n\r\n12345\r\n"));
        assert!(body.contains("filename=\"a.jpg\"\r\n"));
        assert!(body.contains("Content-Type: image/jpeg\r\n\r\nabc\r\n"));
        assert!(body.ends_with(&format!("--{BOUNDARY}--\r\n")));
    }

    #[test]
    fn test_public_dir_starts_empty() {
        let dir = TestPublicDir::new();
        assert!(dir.path().exists());
        assert!(dir.uploaded_files().is_empty());
    }

    #[test]
    fn test_image_bytes() {
        let data = image_bytes(300);
        assert_eq!(data.len(), 300);
        assert_eq!(data[251], 0);
    }
}
