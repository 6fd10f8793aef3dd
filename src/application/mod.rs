// Application layer: wires the scan, the assembler and the exporters together.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::callgraph::{CallGraphAssembler, EntryForest};
use crate::domain::impact::{impacted, ChangeSet};
use crate::infrastructure::classfile::ClassFileReader;
use crate::infrastructure::concurrency::WorkerPool;
use crate::infrastructure::config::AnalyzerConfig;
use crate::infrastructure::exclusion::ExclusionSet;
use crate::infrastructure::pom::MavenPomReader;
use crate::infrastructure::scanner::{ScanOrchestrator, ScanStats};
use crate::ports::ForestExporter;

/// Library façade: artifact roots in, entry-point call trees out.
#[derive(Debug, Clone, Default)]
pub struct InvokeLinkService {
    config: AnalyzerConfig,
}

impl InvokeLinkService {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Build the HTTP and RPC call trees for the classes under `roots`.
    ///
    /// `exclusions` are added to the configured ones.
    pub fn method_invoke_links<P: AsRef<Path>>(
        &self,
        roots: &[P],
        exclusions: &[String],
    ) -> Result<EntryForest> {
        self.analyze(roots, exclusions).map(|(forest, _)| forest)
    }

    /// Like [`Self::method_invoke_links`], also returning the scan counters.
    pub fn analyze<P: AsRef<Path>>(
        &self,
        roots: &[P],
        exclusions: &[String],
    ) -> Result<(EntryForest, ScanStats)> {
        if roots.is_empty() {
            info!("No artifact roots given; nothing to analyze");
            return Ok((EntryForest::default(), ScanStats::default()));
        }

        let patterns = self.config.exclusions.iter().chain(exclusions);
        let exclusions = ExclusionSet::new(patterns).context("Invalid exclusion pattern")?;
        let pool = WorkerPool::new(self.config.workers).context("Failed to build worker pool")?;
        let orchestrator = ScanOrchestrator::new(
            Arc::new(ClassFileReader::new(exclusions)),
            Arc::new(MavenPomReader::new(self.config.build_descriptor.as_str())),
            pool,
        )
        .with_extension(&self.config.artifact_extension);

        let outcome = orchestrator.scan(roots)?;
        let assembler = CallGraphAssembler::new(self.config.cycle_guard, self.config.max_depth);
        let forest = assembler.assemble(outcome.records);
        Ok((forest, outcome.stats))
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub forest: EntryForest,
    pub stats: ScanStats,
    /// Entry points before the change filter was applied.
    pub total_entries: usize,
}

pub struct AnalyzeUsecase<'a> {
    pub service: &'a InvokeLinkService,
    pub exporter: &'a dyn ForestExporter,
}

impl<'a> AnalyzeUsecase<'a> {
    /// Scan, assemble, optionally narrow to the trees touched by `changes`, and
    /// export to `output` when one is given.
    pub fn run<P: AsRef<Path>>(
        &self,
        roots: &[P],
        exclusions: &[String],
        changes: Option<&ChangeSet>,
        output: Option<&str>,
    ) -> Result<AnalysisReport> {
        let (forest, stats) = self.service.analyze(roots, exclusions)?;
        let total_entries = forest.len();

        let forest = match changes {
            Some(changes) => {
                let narrowed = impacted(&forest, changes);
                info!(
                    "{} of {} entry points reach the {} changed classes",
                    narrowed.len(),
                    total_entries,
                    changes.len()
                );
                narrowed
            }
            None => forest,
        };

        if let Some(path) = output {
            self.exporter
                .export(&forest, path)
                .with_context(|| format!("Failed to write {}", path))?;
        }

        Ok(AnalysisReport {
            forest,
            stats,
            total_entries,
        })
    }

    pub fn render(&self, forest: &EntryForest) -> Result<String> {
        self.exporter
            .render(forest)
            .context("Failed to render the entry forest")
    }
}
