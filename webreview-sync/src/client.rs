//! Fileset sync orchestrator.
//!
//! Every `write`/`read`/`delete` runs in two strict phases:
//! 1. Sign: all batches are signed by the signing service. Any failed batch
//!    aborts the call before a single object-store request is made.
//! 2. Execute: the signed requests run through a fresh [`ConcurrentExecutor`]
//!    and per-path outcomes are returned, failures included.

use crate::api_client::{HttpSigningService, SigningService};
use crate::batch::BatchPlanner;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::executor::{ConcurrentExecutor, ExecutionResult, ProgressObserver};
use crate::scanner::scan_directory;
use crate::session::Session;
use crate::signer::RequestSigner;
use crate::PathContentMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use webreview_types::{Commit, Fileset, SignedRequest, Verb};

/// Client for one named fileset of one project.
pub struct FilesetClient {
    fileset: Fileset,
    service: Arc<dyn SigningService>,
    signer: RequestSigner,
    planner: BatchPlanner,
    pool_size: usize,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl FilesetClient {
    /// Creates a client talking to the signing service described by `config`.
    ///
    /// `project` must be in `<owner>/<project>` form.
    pub fn new(
        config: SyncConfig,
        session: Session,
        project: &str,
        name: impl Into<String>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let service = HttpSigningService::new(&config, session)?;
        Self::with_service(config, Arc::new(service), project, name)
    }

    /// Creates a client on top of an existing signing service.
    pub fn with_service(
        config: SyncConfig,
        service: Arc<dyn SigningService>,
        project: &str,
        name: impl Into<String>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let (owner, project) = parse_project(project)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SyncError::Config("fileset name must not be empty".to_string()));
        }

        Ok(Self {
            fileset: Fileset::new(owner, project, name),
            service,
            signer: RequestSigner::new(config.request_timeout())?,
            planner: BatchPlanner::new(config.max_batch_size),
            pool_size: config.pool_size,
            observer: None,
        })
    }

    /// Attaches the commit the fileset was built from.
    pub fn with_commit(mut self, commit: Commit) -> Self {
        self.fileset.commit = Some(commit);
        self
    }

    /// Installs an observer notified after every object-store request.
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn fileset(&self) -> &Fileset {
        &self.fileset
    }

    /// Scans `build_dir` and uploads every file in it.
    pub async fn upload_dir(&self, build_dir: &Path) -> SyncResult<ExecutionResult> {
        let root = build_dir.to_path_buf();
        let items = tokio::task::spawn_blocking(move || scan_directory(&root))
            .await
            .map_err(|e| SyncError::Io {
                path: build_dir.to_path_buf(),
                source: std::io::Error::other(e),
            })??;
        info!("uploading {} files from {}", items.len(), build_dir.display());
        self.write(&items).await
    }

    /// Uploads each entry of `items`.
    pub async fn write(&self, items: &PathContentMap) -> SyncResult<ExecutionResult> {
        self.run(Verb::Put, items).await
    }

    /// Downloads `paths`; bodies are returned in the success map.
    pub async fn read<I, P>(&self, paths: I) -> SyncResult<ExecutionResult>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.run(Verb::Get, &without_content(paths)).await
    }

    pub async fn delete<I, P>(&self, paths: I) -> SyncResult<ExecutionResult>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.run(Verb::Delete, &without_content(paths)).await
    }

    /// Marks the fileset complete. A single RPC, no signing.
    pub async fn finalize(&self) -> SyncResult<serde_json::Value> {
        let resp = self.service.finalize(&self.fileset).await?;
        info!("finalized fileset {} of {}", self.fileset.name, self.fileset.project_slug());
        Ok(resp)
    }

    /// Sign phase only: one RPC per batch, all-or-nothing.
    pub async fn sign(&self, verb: Verb, items: &PathContentMap) -> SyncResult<Vec<SignedRequest>> {
        self.planner
            .sign_all(self.service.as_ref(), verb, &self.fileset, items)
            .await
    }

    async fn run(&self, verb: Verb, items: &PathContentMap) -> SyncResult<ExecutionResult> {
        let signed = self.sign(verb, items).await?;
        let executor = ConcurrentExecutor::new(&self.signer, self.pool_size)
            .with_observer(self.observer.as_deref());
        Ok(executor.execute_all(&signed, items).await)
    }
}

/// Splits `<owner>/<project>`.
fn parse_project(project: &str) -> SyncResult<(&str, &str)> {
    match project.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(SyncError::Config(format!(
            "project must be in format <owner>/<project>, got {project:?}"
        ))),
    }
}

fn without_content<I, P>(paths: I) -> PathContentMap
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    paths.into_iter().map(|p| (p.into(), None)).collect()
}
