//! Concurrent scan orchestrator.
//!
//! Roots are visited one after another. Within a root, artifacts are handed to
//! the worker pool and the root is complete only when every artifact has been
//! processed. Results are merged in walk order so repeated scans agree.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::method::MethodRecord;
use crate::error::ScanError;
use crate::infrastructure::concurrency::WorkerPool;
use crate::ports::{ArtifactReader, BuildDescriptorReader};

pub const DEFAULT_EXTENSION: &str = "class";

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub roots: usize,
    pub artifacts: usize,
    pub excluded: usize,
    pub failed: usize,
    pub records: usize,
    /// Artifact path and error text, sorted by path.
    pub failures: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub records: Vec<MethodRecord>,
    pub stats: ScanStats,
}

pub struct ScanOrchestrator {
    reader: Arc<dyn ArtifactReader>,
    descriptor: Arc<dyn BuildDescriptorReader>,
    pool: WorkerPool,
    extension: String,
}

impl ScanOrchestrator {
    pub fn new(
        reader: Arc<dyn ArtifactReader>,
        descriptor: Arc<dyn BuildDescriptorReader>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            reader,
            descriptor,
            pool,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Scan every root and return the merged method records.
    ///
    /// Unreadable artifacts are counted and skipped. A root that cannot be
    /// enumerated aborts the whole scan.
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> Result<ScanOutcome, ScanError> {
        let mut outcome = ScanOutcome::default();
        let failures: DashMap<PathBuf, String> = DashMap::new();

        for root in roots {
            let root = root.as_ref();
            let namespace = self.descriptor.namespace(root);
            let artifacts = self.collect_artifacts(root)?;
            let excluded = AtomicUsize::new(0);

            let batches = self.pool.run_all(&artifacts, |path| {
                if self.reader.is_excluded(path) {
                    debug!("Excluded artifact {}", path.display());
                    excluded.fetch_add(1, Ordering::Relaxed);
                    return Vec::new();
                }
                match self.reader.extract(path, namespace.as_deref()) {
                    Ok(records) => records,
                    Err(e) => {
                        warn!("Failed to extract invoke links from {}: {}", path.display(), e);
                        failures.insert(path.clone(), e.to_string());
                        Vec::new()
                    }
                }
            });

            let before = outcome.records.len();
            outcome.records.extend(batches.into_iter().flatten());
            let excluded = excluded.into_inner();
            info!(
                "Scanned {}: {} artifacts, {} excluded, {} methods (namespace: {})",
                root.display(),
                artifacts.len(),
                excluded,
                outcome.records.len() - before,
                namespace.as_deref().unwrap_or("<none>")
            );

            outcome.stats.roots += 1;
            outcome.stats.artifacts += artifacts.len();
            outcome.stats.excluded += excluded;
        }

        let mut failures: Vec<(PathBuf, String)> = failures.into_iter().collect();
        failures.sort();
        outcome.stats.failed = failures.len();
        outcome.stats.failures = failures;
        outcome.stats.records = outcome.records.len();
        Ok(outcome)
    }

    /// Every artifact under `root` with the configured extension, in file-name order.
    fn collect_artifacts(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let mut artifacts = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| ScanError::new(root, e))?;
            if entry.file_type().is_file() && self.has_extension(entry.path()) {
                artifacts.push(entry.into_path());
            }
        }
        Ok(artifacts)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
            .unwrap_or(false)
    }
}
