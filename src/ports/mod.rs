// Seams between the domain and the outside world.

use std::path::Path;

use crate::domain::callgraph::EntryForest;
use crate::domain::impact::ChangeSet;
use crate::domain::method::MethodRecord;
use crate::error::ClassFileError;

/// Extracts method records from one compiled artifact.
pub trait ArtifactReader: Send + Sync {
    /// Parse one artifact, surfacing the failure.
    fn extract(&self, path: &Path, namespace: Option<&str>) -> Result<Vec<MethodRecord>, ClassFileError>;

    /// Artifacts the scan should skip without reading.
    fn is_excluded(&self, _path: &Path) -> bool {
        false
    }
}

/// Best-effort namespace lookup from a build descriptor at an artifact root.
pub trait BuildDescriptorReader: Send + Sync {
    /// Internal-form package prefix (e.g. `com/acme`), or `None` when unavailable.
    fn namespace(&self, root: &Path) -> Option<String>;
}

/// Version-control collaborator that reports what changed between two revisions.
pub trait DiffProvider {
    fn changed_classes(&self, base: &str, head: &str) -> anyhow::Result<ChangeSet>;
}

pub trait ForestExporter {
    fn render(&self, forest: &EntryForest) -> std::io::Result<String>;

    fn export(&self, forest: &EntryForest, path: &str) -> std::io::Result<()> {
        std::fs::write(path, self.render(forest)?)
    }
}
