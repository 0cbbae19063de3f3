use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use hashbrown::HashMap;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use rangeframe_error::{RangeFrameError, RangeFrameResult, rangeframe_bail};
use serde::{Deserialize, Serialize};

/// Characters stripped from both ends of every string setting.
const TRIM_CUTSET: &[char] = &[' ', '\t', '\n', '\r', '`', '"'];

/// Connection settings of the object store holding the tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub region: String,
    pub bucket: String,
    /// Custom endpoint of an S3-compatible store. Empty for AWS itself.
    pub endpoint: String,
    #[serde(rename = "useSSL")]
    pub use_ssl: bool,
    #[serde(skip)]
    pub secrets: SecretSettings,
}

/// Static credentials, taken from the host's decrypted key/value store.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretSettings {
    pub access_key: String,
    pub secret_key: String,
}

impl SecretSettings {
    pub fn from_map(secure: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| secure.get(key).cloned().unwrap_or_default();
        Self {
            access_key: lookup("accessKey"),
            secret_key: lookup("secretKey"),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl Debug for SecretSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSettings")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl StoreSettings {
    /// Decode the JSON settings blob and attach the secrets from `secure`.
    pub fn from_json(json: &[u8], secure: &HashMap<String, String>) -> RangeFrameResult<Self> {
        let mut settings: StoreSettings = serde_json::from_slice(json).map_err(|err| {
            RangeFrameError::from(err).with_context("could not decode store settings")
        })?;

        for value in [
            &mut settings.region,
            &mut settings.bucket,
            &mut settings.endpoint,
        ] {
            let trimmed = value.trim_matches(TRIM_CUTSET);
            if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }
        settings.secrets = SecretSettings::from_map(secure);

        log::debug!(
            "loaded store settings region={} bucket={} endpoint={}",
            settings.region,
            settings.bucket,
            settings.endpoint
        );
        Ok(settings)
    }

    pub fn with_secrets(mut self, secrets: SecretSettings) -> Self {
        self.secrets = secrets;
        self
    }

    /// Check that every setting needed to reach the store is present.
    pub fn validate(&self) -> RangeFrameResult<()> {
        if self.region.is_empty() {
            rangeframe_bail!("region is missing");
        }
        if self.bucket.is_empty() {
            rangeframe_bail!("bucket is missing");
        }
        if !self.secrets.is_complete() {
            rangeframe_bail!("store credentials are missing");
        }
        Ok(())
    }

    /// Build an S3 client for the configured bucket.
    ///
    /// A custom endpoint is addressed path-style, as S3-compatible stores expect.
    pub fn build_object_store(&self) -> RangeFrameResult<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::new()
            .with_region(&self.region)
            .with_bucket_name(&self.bucket)
            .with_access_key_id(&self.secrets.access_key)
            .with_secret_access_key(&self.secrets.secret_key);

        if !self.endpoint.is_empty() {
            log::info!("applying path-style routing for endpoint {}", self.endpoint);
            builder = builder
                .with_endpoint(&self.endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(!self.use_ssl);
        }

        Ok(Arc::new(builder.build()?))
    }
}
