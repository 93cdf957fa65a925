use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types that can occur while rendering target content.
///
/// A render error never leaves content half-edited: renderers build the new
/// content separately and only return it when every edit succeeded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The bracketing context of an anchor does not occur in the content.
    #[error("Anchor not found: {anchor}")]
    AnchorNotFound {
        /// Human readable description of the anchor
        anchor: String,
    },

    /// The section does not provide a key the renderer needs.
    #[error("Required key missing from section: {key}")]
    MissingKey {
        /// The key that was looked up
        key: String,
    },

    /// Writing the value would destroy the anchor it was located by, so a
    /// second run could no longer find it.
    #[error("Replacement value would break anchor: {anchor}")]
    ReplacementBreaksAnchor {
        /// Human readable description of the anchor
        anchor: String,
    },

    /// The anchor could not be turned into a matcher.
    #[error("Invalid anchor {anchor}: {reason}")]
    InvalidAnchor {
        /// Human readable description of the anchor
        anchor: String,
        /// Why the matcher could not be built
        reason: String,
    },
}
