//! Application state management

use std::sync::Arc;

use crate::archive::ArchiveBuilder;
use crate::config::Config;
use crate::error::AppError;
use crate::index::DirectoryIndexer;
use crate::paths::PathRegistry;
use crate::signal::FailureSignal;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    paths: PathRegistry,
    failure: FailureSignal,
    indexer: DirectoryIndexer,
    archiver: ArchiveBuilder,
}

impl AppState {
    pub fn new(config: Config, paths: PathRegistry, failure: FailureSignal) -> Self {
        let indexer = DirectoryIndexer::new().with_max_depth(config.transfer.browse_max_depth);
        let archiver = ArchiveBuilder::new(config.transfer.archive_format)
            .with_staging_dir(config.transfer.archive_temp_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                paths,
                failure,
                indexer,
                archiver,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the path registry
    pub fn paths(&self) -> &PathRegistry {
        &self.inner.paths
    }

    /// Get the process-wide failure signal
    pub fn failure(&self) -> &FailureSignal {
        &self.inner.failure
    }

    pub fn indexer(&self) -> &DirectoryIndexer {
        &self.inner.indexer
    }

    pub fn archiver(&self) -> &ArchiveBuilder {
        &self.inner.archiver
    }

    /// Escalate a request error to the failure signal when running fail-fast.
    ///
    /// Only server-side errors are escalated; a bad request from one client
    /// never takes the service down.
    pub fn report(&self, err: &AppError) {
        if self.inner.config.server.fail_fast && err.is_fatal() {
            self.inner
                .failure
                .signal(format!("request failed in fail-fast mode: {}", err));
        }
    }
}
