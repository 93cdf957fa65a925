//! Policy-gated rendering and writing of text targets.

use std::fs;
use std::path::Path;

use canonical_config::Section;
use fragment_renderer::FragmentRenderer;
use tracing::debug;

use crate::dry_run::{DryRunPolicy, WriteEffect};
use crate::errors::TargetError;

#[cfg(test)]
#[path = "text_target_tests.rs"]
mod tests;

/// Renders a section into a target file and writes the result unless the
/// policy is a dry run.
///
/// The file is read and rendered in full before anything is written, so a
/// render failure leaves the target untouched.
#[derive(Debug, Clone, Copy)]
pub struct TextTargetWriter {
    policy: DryRunPolicy,
}

impl TextTargetWriter {
    pub fn new(policy: DryRunPolicy) -> Self {
        Self { policy }
    }

    pub fn apply(
        &self,
        path: &Path,
        renderer: &dyn FragmentRenderer,
        section: &Section,
    ) -> Result<WriteEffect, TargetError> {
        let io_error = |source| TargetError::Io {
            path: path.to_path_buf(),
            source,
        };

        let current = fs::read_to_string(path).map_err(io_error)?;
        let updated = renderer.render(&current, section)?;

        if !self.policy.permits_writes() {
            debug!(path = ?path, changed = updated != current, "Dry run, write suppressed");
            return Ok(WriteEffect::Suppressed);
        }

        if updated == current {
            debug!(path = ?path, "Target already up to date");
        } else {
            fs::write(path, updated).map_err(io_error)?;
            debug!(path = ?path, "Target written");
        }
        Ok(WriteEffect::Written)
    }
}
