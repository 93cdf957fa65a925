//! The four ways a section becomes target file content.

use canonical_config::Section;
use tracing::debug;

use crate::anchor::{apply_anchored, Anchor, AnchorTarget, Bracket};
use crate::errors::RenderError;
use crate::FragmentRenderer;

#[cfg(test)]
#[path = "renderers_tests.rs"]
mod tests;

fn required<'a>(section: &'a Section, key: &str) -> Result<&'a str, RenderError> {
    section.get(key).ok_or_else(|| RenderError::MissingKey {
        key: key.to_string(),
    })
}

/// Replaces the entire target with one section value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WholeFileRenderer {
    pub value_key: String,
    /// Line written before the value, e.g. an XML declaration.
    pub prologue: Option<String>,
}

impl WholeFileRenderer {
    pub fn new(value_key: impl Into<String>) -> Self {
        Self {
            value_key: value_key.into(),
            prologue: None,
        }
    }

    pub fn with_prologue(mut self, prologue: impl Into<String>) -> Self {
        self.prologue = Some(prologue.into());
        self
    }
}

impl FragmentRenderer for WholeFileRenderer {
    fn render(&self, _current: &str, section: &Section) -> Result<String, RenderError> {
        let body = required(section, &self.value_key)?;

        let mut content = String::new();
        if let Some(prologue) = &self.prologue {
            content.push_str(prologue);
            content.push('\n');
        }
        content.push_str(body);
        content.push('\n');
        Ok(content)
    }
}

/// Serializes a section as `key=value` lines in section order.
///
/// Nothing is escaped. A value containing a newline or `=` produces output
/// that a properties reader will not read back as the same pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyValueRenderer;

impl FragmentRenderer for KeyValueRenderer {
    fn render(&self, _current: &str, section: &Section) -> Result<String, RenderError> {
        Ok(section
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect())
    }
}

/// Concatenates pre-formatted section values, one per line, in section order.
///
/// Used for property files made of several multi-line blocks, where each
/// section value is already a complete block and the keys only order them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateRenderer;

impl FragmentRenderer for AggregateRenderer {
    fn render(&self, _current: &str, section: &Section) -> Result<String, RenderError> {
        Ok(section.values().map(|value| format!("{value}\n")).collect())
    }
}

/// How an [`AnchoredRenderer`] turns a section into anchored edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorPlan {
    /// Replace the region located by `anchor` with `section[value_key]`.
    Region { anchor: Anchor, value_key: String },

    /// For every key K, the text of `<element name_attribute="K">`.
    ElementPerKey {
        element: String,
        name_attribute: String,
    },

    /// For every key K, the `value_attribute` of the `element` whose
    /// `tag_attribute` equals K upper-cased.
    TaggedValuePerKey {
        element: String,
        tag_attribute: String,
        value_attribute: String,
    },

    /// Inside the first `container` whose `name_element` text equals
    /// `section[name_key]`, the text of child `<K>` for every key K not in
    /// `skip_keys`.
    NamedChildPerKey {
        container: String,
        name_element: String,
        name_key: String,
        skip_keys: Vec<String>,
    },
}

impl AnchorPlan {
    /// Expands the plan into `(anchor, value)` edits in section order.
    pub fn edits(&self, section: &Section) -> Result<Vec<(Anchor, String)>, RenderError> {
        match self {
            AnchorPlan::Region { anchor, value_key } => Ok(vec![(
                anchor.clone(),
                required(section, value_key)?.to_string(),
            )]),
            AnchorPlan::ElementPerKey {
                element,
                name_attribute,
            } => Ok(section
                .iter()
                .map(|(key, value)| {
                    let anchor = Anchor::new(
                        Bracket::element(element.as_str()).with_attribute(name_attribute.as_str(), key),
                        AnchorTarget::Text,
                    );
                    (anchor, value.to_string())
                })
                .collect()),
            AnchorPlan::TaggedValuePerKey {
                element,
                tag_attribute,
                value_attribute,
            } => Ok(section
                .iter()
                .map(|(key, value)| {
                    let anchor = Anchor::new(
                        Bracket::element(element.as_str())
                            .with_attribute(tag_attribute.as_str(), key.to_uppercase()),
                        AnchorTarget::Attribute(value_attribute.clone()),
                    );
                    (anchor, value.to_string())
                })
                .collect()),
            AnchorPlan::NamedChildPerKey {
                container,
                name_element,
                name_key,
                skip_keys,
            } => {
                let name = required(section, name_key)?;
                let outer = Bracket::element(container.as_str())
                    .with_child_text(name_element.as_str(), name);
                Ok(section
                    .iter()
                    .filter(|(key, _)| {
                        *key != name_key.as_str() && !skip_keys.iter().any(|skip| skip == key)
                    })
                    .map(|(key, value)| {
                        let anchor = Anchor::new(Bracket::element(key), AnchorTarget::Text)
                            .within(outer.clone());
                        (anchor, value.to_string())
                    })
                    .collect())
            }
        }
    }
}

/// Applies anchored edits to the current content of a target.
///
/// Edits are applied one after the other; if any of them fails, the render
/// fails and the caller keeps the content it started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredRenderer {
    pub plan: AnchorPlan,
}

impl AnchoredRenderer {
    pub fn new(plan: AnchorPlan) -> Self {
        Self { plan }
    }
}

impl FragmentRenderer for AnchoredRenderer {
    fn render(&self, current: &str, section: &Section) -> Result<String, RenderError> {
        let edits = self.plan.edits(section)?;
        debug!(edits = edits.len(), "Applying anchored edits");

        let mut content = current.to_string();
        for (anchor, value) in &edits {
            content = apply_anchored(&content, anchor, value)?;
        }
        Ok(content)
    }
}
