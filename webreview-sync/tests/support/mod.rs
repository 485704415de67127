//! Shared helpers for sync pipeline tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use webreview_sync::types::{
    Fileset, SignRequestsRequest, SignRequestsResponse, SignedRequest, SigningParams,
    UnsignedRequest, Verb,
};
use webreview_sync::{PathContentMap, SigningService, SyncConfig, SyncError, SyncResult};
use wiremock::{Request, Respond, ResponseTemplate};

pub const BUCKET_PREFIX: &str = "/bucket";

/// Signs `unsigned` as if the service issued a URL under `store_uri`.
pub fn sign(unsigned: &UnsignedRequest, store_uri: &str) -> SignedRequest {
    SignedRequest {
        request: unsigned.clone(),
        url: format!("{store_uri}{BUCKET_PREFIX}{}", unsigned.path),
        params: SigningParams {
            google_access_id: "signer@example.iam.gserviceaccount.com".into(),
            signature: "c2lnbmF0dXJl".into(),
            expires: 1_700_000_000,
        },
    }
}

/// A signed request for `path` without going through a signing service.
pub fn signed(verb: Verb, path: &str, content: Option<&[u8]>, store_uri: &str) -> SignedRequest {
    let unsigned = webreview_sync::signer::build_unsigned(verb, path, content);
    sign(&unsigned, store_uri)
}

/// `count` files named `/file-000.txt`, `/file-001.txt`, ...
pub fn numbered_files(count: usize) -> PathContentMap {
    (0..count)
        .map(|i| {
            (
                format!("/file-{i:03}.txt"),
                Some(Bytes::from(format!("content {i}"))),
            )
        })
        .collect()
}

pub fn paths_only(paths: &[&str]) -> PathContentMap {
    paths.iter().map(|p| (p.to_string(), None)).collect()
}

/// Config pointing the signing client at `host` (e.g. a MockServer address).
pub fn test_config(host: &str) -> SyncConfig {
    SyncConfig {
        host: host.to_string(),
        secure: false,
        api: "webreview".into(),
        version: "v0".into(),
        request_timeout_secs: 5,
        pool_size: 4,
        max_batch_size: 100,
    }
}

pub fn test_fileset() -> Fileset {
    Fileset::new("owner", "site", "staging")
}

/// In-process signing service with scripted failures.
pub struct FakeSigningService {
    store_uri: String,
    fail_on_call: Option<usize>,
    verb_override: Option<Verb>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    finalized: Mutex<Vec<Fileset>>,
}

impl FakeSigningService {
    pub fn new(store_uri: impl Into<String>) -> Self {
        Self {
            store_uri: store_uri.into(),
            fail_on_call: None,
            verb_override: None,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            finalized: Mutex::new(Vec::new()),
        }
    }

    /// Fails the `n`th sign call (1-based) with a 500.
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Signs every request with `verb` regardless of what was asked.
    pub fn signing_as(mut self, verb: Verb) -> Self {
        self.verb_override = Some(verb);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn finalized(&self) -> Vec<Fileset> {
        self.finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl SigningService for FakeSigningService {
    async fn sign_requests(&self, req: &SignRequestsRequest) -> SyncResult<SignRequestsResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(SyncError::SigningRpc {
                status: Some(500),
                message: format!("batch {call} exceeded deadline"),
            });
        }
        self.batch_sizes
            .lock()
            .unwrap()
            .push(req.unsigned_requests.len());

        let signed_requests = req
            .unsigned_requests
            .iter()
            .map(|u| {
                let mut s = sign(u, &self.store_uri);
                if let Some(verb) = self.verb_override {
                    s.request.verb = verb;
                }
                s
            })
            .collect();
        Ok(SignRequestsResponse { signed_requests })
    }

    async fn finalize(&self, fileset: &Fileset) -> SyncResult<serde_json::Value> {
        self.finalized.lock().unwrap().push(fileset.clone());
        Ok(serde_json::json!({ "fileset": { "name": fileset.name, "finalized": true } }))
    }
}

/// wiremock responder that signs the posted batch against `store_uri`.
pub struct SigningResponder {
    pub store_uri: String,
}

impl Respond for SigningResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let req: SignRequestsRequest = match serde_json::from_slice(&request.body) {
            Ok(req) => req,
            Err(e) => {
                return ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error_message": e.to_string() }));
            }
        };
        let signed_requests: Vec<SignedRequest> = req
            .unsigned_requests
            .iter()
            .map(|u| sign(u, &self.store_uri))
            .collect();
        ResponseTemplate::new(200)
            .set_body_json(SignRequestsResponse { signed_requests })
    }
}
