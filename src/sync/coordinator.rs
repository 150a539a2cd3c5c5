//! Run-level single-flight guard and coarse cancellation

use super::pipeline::SyncPipeline;
use super::report::SyncReport;
use crate::config::BenchsyncConfig;
use crate::loader::CatalogBuilder;
use crate::storage::SqliteStore;
use crate::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::info;

static GLOBAL: OnceLock<SyncCoordinator> = OnceLock::new();

/// Admits one full load-and-sync run at a time
#[derive(Debug, Default)]
pub struct SyncCoordinator {
    running: AtomicBool,
    cancel: Arc<AtomicBool>,
}

/// Marks a run as in progress until dropped
#[derive(Debug)]
pub struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide coordinator used by [`crate::sync::sync`]
    pub fn global() -> &'static SyncCoordinator {
        GLOBAL.get_or_init(SyncCoordinator::new)
    }

    /// Claim the run slot, or fail with `Error::SyncInProgress`
    pub fn try_begin(&self) -> Result<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::SyncInProgress)?;
        self.cancel.store(false, Ordering::SeqCst);
        Ok(RunGuard {
            running: &self.running,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the current run to stop at its next step boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Load the tree at `root` and synchronize it into `store`.
    ///
    /// Loading completes before anything is written, so a load error leaves
    /// the store untouched.
    pub fn run(&self, root: &Path, store: &mut SqliteStore, config: &BenchsyncConfig) -> Result<SyncReport> {
        let _guard = self.try_begin()?;
        info!("Starting synchronization of {}", root.display());

        let catalog = CatalogBuilder::new(config)?.load(root)?;
        SyncPipeline::new(store, config.sync_options())
            .with_cancel_flag(Arc::clone(&self.cancel))
            .run(&catalog)
    }
}
