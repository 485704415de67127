//! Builds unsigned request descriptors and executes signed ones against the
//! object store.
//!
//! The signer never computes signatures itself: it describes what it wants
//! to do (path, verb, content headers), and once the signing service has
//! returned a URL plus query credentials, it performs the HTTP call.

use crate::error::{ObjectStoreError, SyncResult};
use crate::PathContentMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use md5::{Digest, Md5};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use webreview_types::{
    Fileset, RequestHeaders, SignRequestsRequest, SignedRequest, UnsignedRequest, Verb,
};

/// MIME type for directory index paths (`/docs/`).
pub const DIRECTORY_CONTENT_TYPE: &str = "text/html";

/// Fallback when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Guesses the content type the object store should serve `path` with.
pub fn content_type_for(path: &str) -> String {
    if path.ends_with('/') {
        return DIRECTORY_CONTENT_TYPE.to_string();
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Base64 of the MD5 digest, as expected in `Content-MD5`.
pub fn content_md5(content: &[u8]) -> String {
    STANDARD.encode(Md5::digest(content))
}

/// Describes one operation on `path`.
///
/// PUT requests carry content headers; an absent body is uploaded as empty.
/// GET and DELETE carry none.
pub fn build_unsigned(verb: Verb, path: &str, content: Option<&[u8]>) -> UnsignedRequest {
    let headers = match verb {
        Verb::Put => {
            let content = content.unwrap_or_default();
            Some(RequestHeaders {
                content_length: content.len() as u64,
                content_md5: content_md5(content),
                content_type: content_type_for(path),
            })
        }
        Verb::Get | Verb::Delete => None,
    };
    UnsignedRequest {
        path: path.to_string(),
        verb,
        headers,
    }
}

/// Body of one `sign_requests` call: one unsigned request per entry, in map order.
pub fn build_batch_signing_request(
    verb: Verb,
    fileset: &Fileset,
    batch: &PathContentMap,
) -> SignRequestsRequest {
    let unsigned_requests = batch
        .iter()
        .map(|(path, content)| build_unsigned(verb, path, content.as_deref()))
        .collect();
    SignRequestsRequest {
        fileset: fileset.clone(),
        unsigned_requests,
    }
}

/// Executes signed requests against the object store.
///
/// Holds its own HTTP client: signing-service credentials must never reach
/// the object store.
#[derive(Clone)]
pub struct RequestSigner {
    client: Client,
    timeout: Duration,
}

impl RequestSigner {
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Issues the HTTP call described by `signed` and returns the response body.
    ///
    /// Any status outside `[200, 205)` is an error, for every verb.
    pub async fn execute(
        &self,
        signed: &SignedRequest,
        content: Option<Bytes>,
    ) -> Result<Bytes, ObjectStoreError> {
        let params = &signed.params;
        let expires = params.expires.to_string();
        let query = [
            ("GoogleAccessId", params.google_access_id.as_str()),
            ("Signature", params.signature.as_str()),
            ("Expires", expires.as_str()),
        ];

        let builder = match signed.verb() {
            Verb::Put => {
                let body = content.unwrap_or_default();
                let builder = self.client.put(&signed.url).query(&query);
                let builder = match signed.headers() {
                    Some(headers) => builder
                        .header(CONTENT_TYPE, &headers.content_type)
                        .header("Content-MD5", &headers.content_md5)
                        .header(CONTENT_LENGTH, headers.content_length),
                    None => builder,
                };
                builder.body(body)
            }
            Verb::Get => self.client.get(&signed.url).query(&query),
            Verb::Delete => self.client.delete(&signed.url).query(&query),
        };

        let resp = builder.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;

        if !(200..205).contains(&status) {
            return Err(ObjectStoreError::from_response(status, &body));
        }

        debug!(
            "{} {} -> {status} ({} bytes)",
            signed.verb(),
            signed.path(),
            body.len()
        );
        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> ObjectStoreError {
        if err.is_timeout() {
            ObjectStoreError::Timeout(self.timeout)
        } else {
            ObjectStoreError::Transport(err.to_string())
        }
    }
}
