//! HTTP client for the fileset signing service.
//!
//! Talks to the Endpoints API (`/_ah/api/{api}/{version}`) with JSON bodies.
//! Authentication comes from the [`Session`] supplied at construction.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use webreview_types::{Fileset, FinalizeRequest, SignRequestsRequest, SignRequestsResponse};

/// Remote capabilities the sync pipeline consumes.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Signs one batch of unsigned requests.
    async fn sign_requests(&self, req: &SignRequestsRequest) -> SyncResult<SignRequestsResponse>;

    /// Marks the fileset complete server-side.
    async fn finalize(&self, fileset: &Fileset) -> SyncResult<serde_json::Value>;
}

/// [`SigningService`] over HTTP.
pub struct HttpSigningService {
    client: Client,
    api_root: String,
    session: Session,
}

impl HttpSigningService {
    pub fn new(config: &SyncConfig, session: Session) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_root: config.api_root(),
            session,
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// POSTs `body` to `{api_root}/{method}` and decodes the JSON reply.
    async fn call<T>(&self, method: &str, body: &impl Serialize) -> SyncResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{method}", self.api_root);
        let resp = self
            .session
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::SigningRpc {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            debug!("{method} returned {status}");
            return Err(SyncError::SigningRpc {
                status: Some(status.as_u16()),
                message: rpc_reason(&text),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| SyncError::SigningRpc {
            status: Some(status.as_u16()),
            message: format!("failed to read {method} response: {e}"),
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SigningService for HttpSigningService {
    async fn sign_requests(&self, req: &SignRequestsRequest) -> SyncResult<SignRequestsResponse> {
        debug!(
            "signing {} requests for {}",
            req.unsigned_requests.len(),
            req.fileset.name
        );
        self.call("sign_requests", req).await
    }

    async fn finalize(&self, fileset: &Fileset) -> SyncResult<serde_json::Value> {
        let req = FinalizeRequest {
            fileset: fileset.clone(),
        };
        self.call("finalize", &req).await
    }
}

/// Extracts a human-readable reason from an error body.
///
/// Endpoints wraps errors as `{"error": {"message": ...}}`; the service's own
/// errors use `{"error_message": ...}`.
fn rpc_reason(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error_message"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return message.trim().to_string();
        }
    }
    body.trim().to_string()
}
