//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Default upload ceiling (5 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

/// Application configuration.
///
/// Built once at startup and shared read-only through [`crate::AppState`].
#[derive(Clone)]
pub struct Config {
    /// HTTP server port (default: 4000).
    pub port: u16,

    /// Shared secret the client must send as `pinCode`.
    pub upload_pin: String,

    /// Maximum size of one uploaded file in bytes (default: 5 MiB).
    pub max_upload_size: usize,

    /// Root directory served as static files (default: ./public).
    pub public_dir: PathBuf,

    /// Directory uploads are written to (default: $PUBLIC_DIR/uploads).
    pub uploads_dir: PathBuf,

    /// URL prefix under which uploads are served (default: /uploads).
    pub uploads_url: String,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Configuration with defaults and the given upload PIN.
    pub fn new(upload_pin: impl Into<String>) -> Self {
        let public_dir = PathBuf::from("./public");
        Self {
            port: 4000,
            upload_pin: upload_pin.into(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            uploads_dir: public_dir.join("uploads"),
            public_dir,
            uploads_url: "/uploads".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let upload_pin =
            env::var("UPLOAD_PIN").context("UPLOAD_PIN environment variable is required")?;
        if upload_pin.is_empty() {
            bail!("UPLOAD_PIN must not be empty");
        }

        let max_upload_size = env::var("MAX_UPLOAD_SIZE")
            .map(|v| v.parse().context("MAX_UPLOAD_SIZE must be a byte count"))
            .unwrap_or(Ok(DEFAULT_MAX_UPLOAD_SIZE))?;

        let public_dir = env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| public_dir.join("uploads"));

        let uploads_url = env::var("UPLOADS_URL").unwrap_or_else(|_| "/uploads".to_string());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            upload_pin,
            max_upload_size,
            public_dir,
            uploads_dir,
            uploads_url,
            cors_allowed_origins,
        })
    }

    /// Set the public directory; the upload directory moves with it.
    pub fn with_public_dir(mut self, public_dir: impl Into<PathBuf>) -> Self {
        self.public_dir = public_dir.into();
        self.uploads_dir = self.public_dir.join("uploads");
        self
    }

    /// Set the upload directory.
    pub fn with_uploads_dir(mut self, uploads_dir: impl Into<PathBuf>) -> Self {
        self.uploads_dir = uploads_dir.into();
        self
    }

    /// Set the upload size ceiling.
    pub fn with_max_upload_size(mut self, max_upload_size: usize) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }
}

// The PIN stays out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("max_upload_size", &self.max_upload_size)
            .field("public_dir", &self.public_dir)
            .field("uploads_dir", &self.uploads_dir)
            .field("uploads_url", &self.uploads_url)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("12345");
        assert_eq!(config.port, 4000);
        assert_eq!(config.max_upload_size, 5 * 1024 * 1024);
        assert_eq!(config.uploads_dir, PathBuf::from("./public/uploads"));
        assert_eq!(config.uploads_url, "/uploads");
    }

    #[test]
    fn test_public_dir_moves_uploads_dir() {
        let config = Config::new("12345").with_public_dir("/srv/gallery");
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/gallery/uploads"));

        let config = config.with_uploads_dir("/var/uploads");
        assert_eq!(config.public_dir, PathBuf::from("/srv/gallery"));
        assert_eq!(config.uploads_dir, PathBuf::from("/var/uploads"));
    }

    #[test]
    fn test_debug_hides_pin() {
        let config = Config::new("super-secret-pin");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-pin"));
        assert!(debug.contains("uploads_url"));
    }
}
