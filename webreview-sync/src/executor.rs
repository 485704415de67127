//! Concurrent execution of signed requests with per-path outcomes.
//!
//! Each signed request is one independent unit of work spawned onto the
//! runtime. A semaphore of `pool_size` permits caps how many are in flight;
//! outcomes flow back to the calling task, which is the only writer of the
//! result maps. Failures are recorded per path and never escape the executor.

use crate::error::ObjectStoreError;
use crate::signer::RequestSigner;
use crate::PathContentMap;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use webreview_types::SignedRequest;

/// Default number of requests in flight.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Snapshot handed to a [`ProgressObserver`] after each completed unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionProgress {
    pub path: String,
    pub succeeded: bool,
    pub completed: usize,
    pub total: usize,
}

/// Receives one call per completed request, success or failure alike.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &ExecutionProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ExecutionProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &ExecutionProgress) {
        self(progress)
    }
}

/// Outcome of an execute phase. A path appears in exactly one map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionResult {
    /// Path to raw response body.
    pub successes: BTreeMap<String, Bytes>,
    pub failures: BTreeMap<String, ObjectStoreError>,
}

impl ExecutionResult {
    pub fn record(&mut self, path: String, outcome: Result<Bytes, ObjectStoreError>) {
        match outcome {
            Ok(body) => {
                self.failures.remove(&path);
                self.successes.insert(path, body);
            }
            Err(err) => {
                self.successes.remove(&path);
                self.failures.insert(path, err);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no path failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<String, Bytes>,
        BTreeMap<String, ObjectStoreError>,
    ) {
        (self.successes, self.failures)
    }
}

/// Runs signed requests through a bounded pool.
///
/// Built fresh for every operation; nothing is shared between calls.
pub struct ConcurrentExecutor<'a> {
    signer: &'a RequestSigner,
    pool_size: usize,
    observer: Option<&'a dyn ProgressObserver>,
}

impl<'a> ConcurrentExecutor<'a> {
    pub fn new(signer: &'a RequestSigner, pool_size: usize) -> Self {
        Self {
            signer,
            pool_size: pool_size.max(1),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<&'a dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Executes every request and waits for all of them to finish.
    ///
    /// A single request runs inline on the calling task. Content is looked
    /// up by path and only sent for PUT.
    pub async fn execute_all(
        &self,
        requests: &[SignedRequest],
        contents: &PathContentMap,
    ) -> ExecutionResult {
        let total = requests.len();
        let mut result = ExecutionResult::default();
        let mut completed = 0;

        match requests {
            [] => {}
            [only] => {
                let outcome = self.run_one(only, contents).await;
                completed += 1;
                self.finish(&mut result, only.path().to_string(), outcome, completed, total);
            }
            _ => {
                debug!("executing {total} requests, {} at a time", self.pool_size);
                let permits = Arc::new(Semaphore::new(self.pool_size));
                let mut pending = BTreeSet::new();
                let mut tasks = JoinSet::new();

                for req in requests {
                    let signer = self.signer.clone();
                    let permits = Arc::clone(&permits);
                    let req = req.clone();
                    let content = content_for(&req, contents);
                    pending.insert(req.path().to_string());

                    tasks.spawn(async move {
                        let path = req.path().to_string();
                        let _permit = match permits.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(e) => return (path, Err(ObjectStoreError::Transport(e.to_string()))),
                        };
                        let outcome = signer.execute(&req, content).await;
                        (path, outcome)
                    });
                }

                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok((path, outcome)) => {
                            pending.remove(&path);
                            completed += 1;
                            self.finish(&mut result, path, outcome, completed, total);
                        }
                        Err(e) => error!("request task failed: {e}"),
                    }
                }

                // Paths whose task panicked or was cancelled.
                for path in pending {
                    completed += 1;
                    let outcome = Err(ObjectStoreError::Transport("request task aborted".into()));
                    self.finish(&mut result, path, outcome, completed, total);
                }
            }
        }

        info!(
            "executed {total} requests: {} succeeded, {} failed",
            result.successes.len(),
            result.failures.len()
        );
        result
    }

    async fn run_one(
        &self,
        req: &SignedRequest,
        contents: &PathContentMap,
    ) -> Result<Bytes, ObjectStoreError> {
        self.signer.execute(req, content_for(req, contents)).await
    }

    fn finish(
        &self,
        result: &mut ExecutionResult,
        path: String,
        outcome: Result<Bytes, ObjectStoreError>,
        completed: usize,
        total: usize,
    ) {
        let succeeded = outcome.is_ok();
        if let Err(ref e) = outcome {
            warn!("{path}: {e}");
        }
        result.record(path.clone(), outcome);

        if let Some(observer) = self.observer {
            observer.on_progress(&ExecutionProgress {
                path,
                succeeded,
                completed,
                total,
            });
        }
    }
}

/// Body to send for `req`; only PUT carries content.
fn content_for(req: &SignedRequest, contents: &PathContentMap) -> Option<Bytes> {
    if req.verb().sends_content() {
        contents.get(req.path()).cloned().flatten()
    } else {
        None
    }
}
