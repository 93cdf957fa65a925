//! Finds the metadata models a platform run reconciles.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use canonical_config::CanonicalConfig;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::PreflightError;
use crate::registry::{METADATA_SUFFIX, SOLUTIONS_DIR};

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;

/// A `.xmi` section paired with the model file it configures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTarget {
    pub section: String,
    pub path: PathBuf,
}

/// Pairs every `.xmi` section with `<root>/pentaho-solutions/<section>`.
///
/// A section whose file does not exist fails pre-flight. Model files found
/// anywhere under `root` without a section are reported as warnings and
/// left alone.
pub fn discover_metadata(
    root: &Path,
    config: &CanonicalConfig,
) -> Result<Vec<MetadataTarget>, PreflightError> {
    let solutions = root.join(SOLUTIONS_DIR);

    let mut targets = Vec::new();
    for section in config
        .section_names()
        .filter(|name| name.ends_with(METADATA_SUFFIX))
    {
        let path = solutions.join(section.trim_start_matches('/'));
        if !path.is_file() {
            return Err(PreflightError::TargetMissing {
                target: section.to_string(),
                location: path.display().to_string(),
            });
        }
        targets.push(MetadataTarget {
            section: section.to_string(),
            path,
        });
    }

    let configured: HashSet<&Path> = targets.iter().map(|t| t.path.as_path()).collect();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry while looking for metadata files");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
    {
        let path = entry.path();
        let is_model = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(METADATA_SUFFIX));
        if !is_model || configured.contains(path) {
            continue;
        }

        let shown = path.strip_prefix(&solutions).unwrap_or(path);
        warn!(file = %shown.display(), "Configuration missing for metadata file");
    }

    debug!(count = targets.len(), "Metadata targets discovered");
    Ok(targets)
}
