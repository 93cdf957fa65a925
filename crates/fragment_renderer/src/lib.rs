//! Fragment renderers for reconfigure
//!
//! This crate turns a canonical configuration section into the content of a
//! target file. It never writes anything: a renderer receives the current
//! content of the target and returns the content it should have.
//!
//! Four renderers cover the target formats:
//!
//! - [`WholeFileRenderer`] replaces the whole file with one section value
//! - [`AnchoredRenderer`] edits single values inside existing XML-like content,
//!   located by a structured [`Anchor`]
//! - [`KeyValueRenderer`] writes Java-style `key=value` lines
//! - [`AggregateRenderer`] concatenates pre-formatted blocks
//!
//! ## Examples
//!
//! ```rust
//! use canonical_config::Section;
//! use fragment_renderer::{AnchorPlan, AnchoredRenderer, FragmentRenderer};
//!
//! let renderer = AnchoredRenderer::new(AnchorPlan::ElementPerKey {
//!     element: "property".to_string(),
//!     name_attribute: "name".to_string(),
//! });
//! let section: Section = [("dialect", "MySQL5")].into_iter().collect();
//!
//! let current = r#"<property name="dialect">HSQL</property>"#;
//! let updated = renderer.render(current, &section).unwrap();
//! assert_eq!(updated, r#"<property name="dialect">MySQL5</property>"#);
//! ```

use canonical_config::Section;

pub mod anchor;
pub mod errors;
pub mod renderers;

pub use anchor::{anchor_exists, apply_anchored, Anchor, AnchorTarget, Bracket, Discriminator};
pub use errors::RenderError;
pub use renderers::{
    AggregateRenderer, AnchorPlan, AnchoredRenderer, KeyValueRenderer, WholeFileRenderer,
};

/// Produces the new content of a target from its current content and the
/// section that governs it.
pub trait FragmentRenderer {
    fn render(&self, current: &str, section: &Section) -> Result<String, RenderError>;
}
