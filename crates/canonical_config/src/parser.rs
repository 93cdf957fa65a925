//! Line-oriented parser for INI-style canonical configuration text.

use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{ConfigParseError, ConfigParseResult};
use crate::section::Section;

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;

/// Parses canonical configuration text into ordered sections.
///
/// Continuation lines (lines starting with whitespace) are appended to the
/// value of the most recent key, joined with `\n`. This is what allows XML
/// fragments to be embedded as multi-line values.
pub(crate) fn parse_sections(text: &str) -> ConfigParseResult<IndexMap<String, Section>> {
    let mut sections: IndexMap<String, Section> = IndexMap::new();
    let mut current_section: Option<String> = None;
    let mut current_key: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;

        if raw.trim().is_empty() || raw.starts_with('#') || raw.starts_with(';') {
            continue;
        }

        if raw.starts_with(char::is_whitespace) {
            let continued = match (&current_section, &current_key) {
                (Some(section), Some(key)) => sections
                    .get_mut(section)
                    .and_then(|s| s.value_mut(key)),
                _ => None,
            };
            match continued {
                Some(value) => {
                    value.push('\n');
                    value.push_str(raw.trim());
                }
                None => {
                    return Err(ConfigParseError::MalformedLine {
                        line: line_number,
                        content: raw.trim().to_string(),
                    })
                }
            }
            continue;
        }

        if let Some(header) = raw.strip_prefix('[') {
            let name = match header.find(']') {
                Some(end) => header[..end].trim(),
                None => {
                    return Err(ConfigParseError::MalformedLine {
                        line: line_number,
                        content: raw.to_string(),
                    })
                }
            };
            if name.is_empty() {
                return Err(ConfigParseError::EmptySectionName { line: line_number });
            }
            if sections.contains_key(name) {
                return Err(ConfigParseError::DuplicateSection {
                    name: name.to_string(),
                    line: line_number,
                });
            }

            debug!(section = name, line = line_number, "Parsed section header");
            sections.insert(name.to_string(), Section::new());
            current_section = Some(name.to_string());
            current_key = None;
            continue;
        }

        let section_name = current_section
            .as_ref()
            .ok_or(ConfigParseError::MissingSectionHeader { line: line_number })?;

        let (key, value) = split_entry(raw).ok_or_else(|| ConfigParseError::MalformedLine {
            line: line_number,
            content: raw.to_string(),
        })?;

        if let Some(section) = sections.get_mut(section_name) {
            section.insert(key.clone(), value);
        }
        current_key = Some(key);
    }

    if sections.is_empty() {
        return Err(ConfigParseError::NoSections);
    }

    Ok(sections)
}

/// Splits `key: value` or `key = value` at whichever delimiter comes first.
fn split_entry(line: &str) -> Option<(String, String)> {
    let position = line.find([':', '='])?;
    let key = line[..position].trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    let value = line[position + 1..].trim().to_string();
    Some((key, value))
}

/// Renders sections back into INI text that parses to the same sections.
pub(crate) fn render_sections(sections: &IndexMap<String, Section>) -> String {
    let mut out = String::new();

    for (index, (name, section)) in sections.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");

        for (key, value) in section.iter() {
            let mut lines = value.split('\n');
            out.push_str(key);
            out.push(':');
            if let Some(first) = lines.next() {
                if !first.is_empty() {
                    out.push(' ');
                    out.push_str(first);
                }
            }
            out.push('\n');
            for continuation in lines {
                out.push_str("    ");
                out.push_str(continuation);
                out.push('\n');
            }
        }
    }

    out
}
