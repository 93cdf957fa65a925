//! Structured anchors for editing a single value inside foreign-format text.
//!
//! An [`Anchor`] names a bracketing context such as "inside the `<connection>`
//! whose `<name>` is `OTI Kettle`, the text of `<server>`" or "the
//! `<bean id="dataSource">` block". [`apply_anchored`] locates the **first**
//! match of that context and splices only the targeted span, leaving every
//! other byte of the content as it was. Later duplicates of the same context
//! are never touched.
//!
//! The matcher is deliberately not an XML parser. Opening tags are found with
//! a regular expression and the closing tag is the first `</element>` that
//! follows, so elements nested inside an element of the same name are not
//! supported.

use std::fmt;
use std::ops::Range;

use regex::Regex;
use tracing::debug;

use crate::errors::RenderError;

#[cfg(test)]
#[path = "anchor_tests.rs"]
mod tests;

/// Distinguishes one element from its siblings of the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    /// The element carries `name="value"` (either quote style).
    Attribute { name: String, value: String },
    /// The element has a child `<name>` whose trimmed text equals `value`.
    ChildText { name: String, value: String },
}

/// An element name, optionally narrowed by a [`Discriminator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    pub element: String,
    pub discriminator: Option<Discriminator>,
}

impl Bracket {
    pub fn element(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            discriminator: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.discriminator = Some(Discriminator::Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_child_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.discriminator = Some(Discriminator::ChildText {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.element)?;
        match &self.discriminator {
            Some(Discriminator::Attribute { name, value }) => write!(f, "[@{name}='{value}']"),
            Some(Discriminator::ChildText { name, value }) => write!(f, "[{name}='{value}']"),
            None => Ok(()),
        }
    }
}

/// Which part of the located element is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorTarget {
    /// The whole element, opening tag to closing tag.
    Region,
    /// The text between the opening and closing tags.
    Text,
    /// The value of the named attribute on the opening tag.
    Attribute(String),
}

/// A structured bracketing context: an optional outer element that scopes
/// the search, the inner element that holds the value, and the part of the
/// inner element to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub outer: Option<Bracket>,
    pub inner: Bracket,
    pub target: AnchorTarget,
}

impl Anchor {
    pub fn new(inner: Bracket, target: AnchorTarget) -> Self {
        Self {
            outer: None,
            inner,
            target,
        }
    }

    /// Restricts the search to the body of the first `outer` match.
    pub fn within(mut self, outer: Bracket) -> Self {
        self.outer = Some(outer);
        self
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(outer) = &self.outer {
            write!(f, "{outer} > ")?;
        }
        write!(f, "{}", self.inner)?;
        match &self.target {
            AnchorTarget::Region => write!(f, " region"),
            AnchorTarget::Text => write!(f, " text"),
            AnchorTarget::Attribute(name) => write!(f, " @{name}"),
        }
    }
}

/// Replaces the value identified by `anchor` with `value`.
///
/// Fails with [`RenderError::AnchorNotFound`] when the context is absent, in
/// which case no output is produced at all. The value is inserted verbatim;
/// callers supply already-escaped text.
///
/// Applying the same anchor and value to the output again yields the output
/// unchanged. A value that would make this false (for example a text value
/// containing the element's own closing tag) is rejected with
/// [`RenderError::ReplacementBreaksAnchor`].
pub fn apply_anchored(content: &str, anchor: &Anchor, value: &str) -> Result<String, RenderError> {
    let located = locate(content, anchor)?;

    let replacement = match &located.close_tag {
        Some(close_tag) => format!(">{value}{close_tag}"),
        None => value.to_string(),
    };

    let mut updated = String::with_capacity(content.len() + replacement.len());
    updated.push_str(&content[..located.range.start]);
    updated.push_str(&replacement);
    updated.push_str(&content[located.range.end..]);

    let relocated = locate(&updated, anchor).map_err(|_| breaks(anchor))?;
    if relocated.close_tag.is_some() || &updated[relocated.range] != value {
        return Err(breaks(anchor));
    }

    debug!(anchor = %anchor, "Anchored value replaced");
    Ok(updated)
}

/// Returns `true` if the anchor's context occurs in `content`.
pub fn anchor_exists(content: &str, anchor: &Anchor) -> Result<bool, RenderError> {
    match locate(content, anchor) {
        Ok(_) => Ok(true),
        Err(RenderError::AnchorNotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

fn breaks(anchor: &Anchor) -> RenderError {
    RenderError::ReplacementBreaksAnchor {
        anchor: anchor.to_string(),
    }
}

/// The span to splice. `close_tag` is set when the target is the text of a
/// self-closing element, which has to be expanded into an open/close pair.
struct Located {
    range: Range<usize>,
    close_tag: Option<String>,
}

struct ElementSpan {
    start: usize,
    open_end: usize,
    close_start: usize,
    end: usize,
    self_closing: bool,
}

fn locate(content: &str, anchor: &Anchor) -> Result<Located, RenderError> {
    let invalid = |e: regex::Error| RenderError::InvalidAnchor {
        anchor: anchor.to_string(),
        reason: e.to_string(),
    };
    let not_found = || RenderError::AnchorNotFound {
        anchor: anchor.to_string(),
    };

    let (offset, scope) = match &anchor.outer {
        Some(outer) => {
            let span = find_element(content, outer)
                .map_err(invalid)?
                .ok_or_else(not_found)?;
            (span.open_end, &content[span.open_end..span.close_start])
        }
        None => (0, content),
    };

    let element = find_element(scope, &anchor.inner)
        .map_err(invalid)?
        .ok_or_else(not_found)?;

    let (range, close_tag) = match &anchor.target {
        AnchorTarget::Region => (element.start..element.end, None),
        AnchorTarget::Text if element.self_closing => (
            element.open_end - 2..element.open_end,
            Some(format!("</{}>", anchor.inner.element)),
        ),
        AnchorTarget::Text => (element.open_end..element.close_start, None),
        AnchorTarget::Attribute(name) => {
            let tag = &scope[element.start..element.open_end];
            let value = find_attribute(tag, name)
                .map_err(invalid)?
                .ok_or_else(not_found)?;
            (element.start + value.start..element.start + value.end, None)
        }
    };

    Ok(Located {
        range: offset + range.start..offset + range.end,
        close_tag,
    })
}

fn find_element(content: &str, bracket: &Bracket) -> Result<Option<ElementSpan>, regex::Error> {
    let start_tag = Regex::new(&format!(
        r"<{}(?:\s[^>]*)?/?>",
        regex::escape(&bracket.element)
    ))?;
    let close_tag = format!("</{}>", bracket.element);

    for tag in start_tag.find_iter(content) {
        let self_closing = tag.as_str().ends_with("/>");
        let (close_start, end) = if self_closing {
            (tag.end(), tag.end())
        } else {
            match content[tag.end()..].find(&close_tag) {
                Some(position) => {
                    let close_start = tag.end() + position;
                    (close_start, close_start + close_tag.len())
                }
                None => continue,
            }
        };

        let span = ElementSpan {
            start: tag.start(),
            open_end: tag.end(),
            close_start,
            end,
            self_closing,
        };

        if matches_discriminator(content, &span, bracket.discriminator.as_ref())? {
            return Ok(Some(span));
        }
    }

    Ok(None)
}

fn matches_discriminator(
    content: &str,
    span: &ElementSpan,
    discriminator: Option<&Discriminator>,
) -> Result<bool, regex::Error> {
    match discriminator {
        None => Ok(true),
        Some(Discriminator::Attribute { name, value }) => {
            let tag = &content[span.start..span.open_end];
            Ok(find_attribute(tag, name)?
                .map(|range| &tag[range] == value.as_str())
                .unwrap_or(false))
        }
        Some(Discriminator::ChildText { name, value }) => {
            let body = &content[span.open_end..span.close_start];
            Ok(find_element(body, &Bracket::element(name.as_str()))?
                .map(|child| body[child.open_end..child.close_start].trim() == value.trim())
                .unwrap_or(false))
        }
    }
}

/// Returns the byte range of the attribute's value within `tag`.
fn find_attribute(tag: &str, name: &str) -> Result<Option<Range<usize>>, regex::Error> {
    let pattern = Regex::new(&format!(
        r#"\s{}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(name)
    ))?;

    Ok(pattern
        .captures(tag)
        .and_then(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|value| value.range()))
}
