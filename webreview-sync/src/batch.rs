//! Splits large path maps into bounded signing batches.
//!
//! The signing service has a practical request-size ceiling; each batch is
//! signed by exactly one RPC, and the sign phase is all-or-nothing.

use crate::api_client::SigningService;
use crate::error::{SyncError, SyncResult};
use crate::signer::build_batch_signing_request;
use crate::PathContentMap;
use std::collections::HashSet;
use tracing::{debug, warn};
use webreview_types::{Fileset, SignedRequest, Verb};

/// Default number of unsigned requests per signing RPC.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

#[derive(Clone, Copy, Debug)]
pub struct BatchPlanner {
    max_batch_size: usize,
}

impl Default for BatchPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BATCH_SIZE)
    }
}

impl BatchPlanner {
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Splits `items` into consecutive batches of at most `max_batch_size`
    /// entries, following the map's key order.
    pub fn plan(&self, items: &PathContentMap) -> Vec<PathContentMap> {
        let mut batches = Vec::with_capacity(items.len().div_ceil(self.max_batch_size));
        let mut current = PathContentMap::new();
        for (path, content) in items {
            current.insert(path.clone(), content.clone());
            if current.len() == self.max_batch_size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    /// Signs every batch in order and concatenates the results.
    ///
    /// Fails on the first batch whose RPC fails; nothing signed so far is
    /// returned, so no object-store call can follow a partial sign phase.
    pub async fn sign_all(
        &self,
        service: &dyn SigningService,
        verb: Verb,
        fileset: &Fileset,
        items: &PathContentMap,
    ) -> SyncResult<Vec<SignedRequest>> {
        let batches = self.plan(items);
        let total = batches.len();
        let mut signed = Vec::with_capacity(items.len());

        for (index, batch) in batches.iter().enumerate() {
            let req = build_batch_signing_request(verb, fileset, batch);
            let resp = service.sign_requests(&req).await.map_err(|e| {
                warn!("signing batch {}/{total} failed: {e}", index + 1);
                e
            })?;
            debug!(
                "signed batch {}/{total}: {} {} requests",
                index + 1,
                resp.signed_requests.len(),
                verb
            );
            signed.extend(resp.signed_requests);
        }

        check_signed(verb, items, &signed)?;
        Ok(signed)
    }
}

/// Every signed request must match the requested verb, name a requested
/// path, and appear once.
fn check_signed(verb: Verb, items: &PathContentMap, signed: &[SignedRequest]) -> SyncResult<()> {
    let mut seen = HashSet::with_capacity(signed.len());
    for req in signed {
        if req.verb() != verb {
            return Err(SyncError::InvalidSignedRequest(format!(
                "{} signed as {} but {verb} was requested",
                req.path(),
                req.verb()
            )));
        }
        if !items.contains_key(req.path()) {
            return Err(SyncError::InvalidSignedRequest(format!(
                "{} was never requested",
                req.path()
            )));
        }
        if !seen.insert(req.path()) {
            return Err(SyncError::InvalidSignedRequest(format!(
                "{} signed more than once",
                req.path()
            )));
        }
    }
    if seen.len() != items.len() {
        return Err(SyncError::InvalidSignedRequest(format!(
            "{} of {} paths were signed",
            seen.len(),
            items.len()
        )));
    }
    Ok(())
}
