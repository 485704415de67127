//! Fileset sync client for WebReview.
//!
//! Uploads a local build directory to object storage through pre-signed
//! requests:
//! - Unsigned request descriptors with content headers (`signer`)
//! - Bounded signing batches, all-or-nothing (`batch`)
//! - Concurrent execution with per-path outcomes (`executor`)
//! - Directory scanning (`scanner`)
//! - Signing-service RPC client (`api_client`)
//! - Orchestration over a named fileset (`client`)

pub mod api_client;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod scanner;
pub mod session;
pub mod signer;

use bytes::Bytes;
use std::collections::BTreeMap;

/// Object path (leading `/`) to content. Content is `None` for reads and deletes.
///
/// Ordered so that batching is deterministic.
pub type PathContentMap = BTreeMap<String, Option<Bytes>>;

pub use api_client::{HttpSigningService, SigningService};
pub use batch::BatchPlanner;
pub use client::FilesetClient;
pub use config::SyncConfig;
pub use error::{ObjectStoreError, SyncError, SyncResult};
pub use executor::{ConcurrentExecutor, ExecutionProgress, ExecutionResult, ProgressObserver};
pub use session::Session;
pub use signer::RequestSigner;
pub use webreview_types as types;
