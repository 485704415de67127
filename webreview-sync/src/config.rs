//! Client configuration.

use crate::batch::DEFAULT_MAX_BATCH_SIZE;
use crate::error::{SyncError, SyncResult};
use crate::executor::DEFAULT_POOL_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the fileset sync client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Signing service host, optionally with port (e.g., "webreview.example.com").
    pub host: String,

    /// Use https for the signing service.
    pub secure: bool,

    /// API name in the RPC path.
    pub api: String,

    /// API version in the RPC path.
    pub version: String,

    /// Per-request timeout for both signing RPCs and object-store calls.
    pub request_timeout_secs: u64,

    /// Number of object-store requests in flight at once.
    pub pool_size: usize,

    /// Maximum unsigned requests per signing RPC.
    pub max_batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8080".to_string(),
            secure: false,
            api: "webreview".to_string(),
            version: "v0".to_string(),
            request_timeout_secs: 60,
            pool_size: DEFAULT_POOL_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl SyncConfig {
    /// Root of the Endpoints API, e.g. `https://host/_ah/api/webreview/v0`.
    pub fn api_root(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!(
            "{scheme}://{}/_ah/api/{}/{}",
            self.host.trim_end_matches('/'),
            self.api,
            self.version
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects configurations that cannot work before any network call is made.
    pub fn validate(&self) -> SyncResult<()> {
        if self.host.trim().is_empty() {
            return Err(SyncError::Config("host must not be empty".to_string()));
        }
        if self.api.is_empty() || self.version.is_empty() {
            return Err(SyncError::Config("api and version must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(SyncError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(SyncError::Config("pool_size must be greater than zero".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(SyncError::Config(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
