//! Configuration for the identity core

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{IdentityError, Result};

/// Default record store endpoint (json-server style REST collections)
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Name of the durable slot holding the serialized actor
pub const DEFAULT_SLOT_KEY: &str = "currentUser";

/// Identity core configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Root URL of the record store
    pub base_url: String,

    /// Upper bound on every record store call
    pub request_timeout: Duration,

    /// Directory for the file-backed durable slot
    pub slot_dir: PathBuf,

    /// Key of the durable slot
    pub slot_key: String,

    /// Where unauthenticated navigations are sent
    pub sign_in_path: String,

    /// Where authenticated actors land when a target is off-limits
    pub default_landing_path: String,

    /// Session actor mailbox depth
    pub mailbox_capacity: usize,
}

impl IdentityConfig {
    /// Create config with sensible defaults
    ///
    /// The durable slot lives under `$TUTORLINK_SESSION_DIR`, falling back
    /// to `<tmp>/tutorlink`:
    /// ```text
    /// slot_dir/
    /// └── currentUser.json
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
            slot_dir: std::env::var("TUTORLINK_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("tutorlink")),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            sign_in_path: "/login".to_string(),
            default_landing_path: "/dashboard".to_string(),
            mailbox_capacity: 64,
        }
    }

    /// Build from `TUTORLINK_API_URL` and `TUTORLINK_REQUEST_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("TUTORLINK_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var("TUTORLINK_REQUEST_TIMEOUT_MS") {
            let millis: u64 = raw.parse().map_err(|_| {
                IdentityError::Config(format!("TUTORLINK_REQUEST_TIMEOUT_MS is not a number: {raw}"))
            })?;
            config = config.with_request_timeout(Duration::from_millis(millis));
        }

        config.validate()?;
        Ok(config)
    }

    /// Override request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override durable slot directory
    pub fn with_slot_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.slot_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Override durable slot key
    pub fn with_slot_key(mut self, key: impl Into<String>) -> Self {
        self.slot_key = key.into();
        self
    }

    /// Override sign-in entry point
    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Override default landing page
    pub fn with_default_landing_path(mut self, path: impl Into<String>) -> Self {
        self.default_landing_path = path.into();
        self
    }

    /// Parsed base URL, guaranteed to end with `/` so joins append
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)?;
        if url.cannot_be_a_base() {
            return Err(IdentityError::Config(format!("Not a base URL: {}", self.base_url)));
        }
        Ok(url)
    }

    /// Path of the durable slot file
    pub fn slot_path(&self) -> PathBuf {
        self.slot_dir.join(format!("{}.json", self.slot_key))
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.request_timeout.is_zero() {
            return Err(IdentityError::Config("request timeout must be non-zero".into()));
        }
        if self.slot_key.is_empty() {
            return Err(IdentityError::Config("slot key must not be empty".into()));
        }
        if self.mailbox_capacity == 0 {
            return Err(IdentityError::Config("mailbox capacity must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
