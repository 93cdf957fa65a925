//! The static target registry: what each profile reconciles, where, and how.

use std::fmt;
use std::str::FromStr;

use canonical_config::{CanonicalConfig, Section};
use fragment_renderer::{
    AggregateRenderer, Anchor, AnchorPlan, AnchorTarget, AnchoredRenderer, Bracket,
    FragmentRenderer, KeyValueRenderer, RenderError, WholeFileRenderer,
};

use crate::catalog::{TableSpec, DATASOURCE, R_DATABASE, USERS};
use crate::errors::TargetError;
use crate::outcome::TargetKind;
use crate::relational::{DesiredRow, ReconcileMode};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// Directory of the platform install holding solution files and metadata.
pub const SOLUTIONS_DIR: &str = "pentaho-solutions";

/// Section name suffix, and file extension, of metadata models.
pub const METADATA_SUFFIX: &str = ".xmi";

/// The kind of installation being reconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// BI platform install: web app and solution files plus the datasource catalog.
    Platform,
    /// ETL repository: the repositories file plus the connection catalog.
    Repository,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Platform => "platform",
            Profile::Repository => "repository",
        }
    }

    /// `CONNECTION` key holding the catalog URL.
    pub fn catalog_url_key(self) -> &'static str {
        match self {
            Profile::Platform => "hibernate",
            Profile::Repository => "db",
        }
    }

    /// Keys the `CONNECTION` section must carry.
    pub fn required_connection_keys(self) -> &'static [&'static str] {
        match self {
            Profile::Platform => &["hibernate"],
            Profile::Repository => &["db", "repositories", "name"],
        }
    }

    pub fn requires_install_root(self) -> bool {
        self == Profile::Platform
    }

    /// Directories that must exist under the install root.
    pub fn required_layout(self) -> &'static [&'static str] {
        match self {
            Profile::Platform => &["tomcat"],
            Profile::Repository => &[],
        }
    }

    /// Whether `.xmi` sections and files are reconciled.
    pub fn discovers_metadata(self) -> bool {
        self == Profile::Platform
    }

    /// The registered targets, in the order they are applied within each pass.
    pub fn targets(self) -> Vec<TargetDescriptor> {
        match self {
            Profile::Platform => platform_targets(),
            Profile::Repository => repository_targets(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subset of targets selected by restrict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    /// Metadata models found in the install tree.
    Metadata,
    /// Registered text files.
    Files,
    /// Catalog rows.
    Relational,
}

impl FromStr for TargetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metadata" | "xmi" => Ok(TargetClass::Metadata),
            "files" => Ok(TargetClass::Files),
            "relational" => Ok(TargetClass::Relational),
            other => Err(format!(
                "unknown target class '{other}', expected metadata, files or relational"
            )),
        }
    }
}

/// Where a text target takes its section from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionSource {
    Named(&'static str),
    /// The consumed `CONNECTION` section.
    Connection,
}

/// Where a text target lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextLocation {
    /// Relative to the install root.
    InstallRelative(&'static str),
    /// A path held by the given `CONNECTION` key.
    ConnectionPath(&'static str),
}

/// How the key-column value of a row is derived from its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    SectionName,
    /// The section name with the selection prefix removed.
    PrefixStripped,
    /// The value of a field in the section.
    Field(&'static str),
}

/// Which sections become rows of a relational target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSelection {
    Prefixed { prefix: &'static str, key: RowKey },
    /// Every section no other target of the profile claims.
    Unclaimed,
}

/// The renderer of a text target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRenderer {
    Whole(WholeFileRenderer),
    Anchored(AnchoredRenderer),
    KeyValue(KeyValueRenderer),
    Aggregate(AggregateRenderer),
}

impl TextRenderer {
    pub fn kind(&self) -> TargetKind {
        match self {
            TextRenderer::Whole(_) => TargetKind::TextWhole,
            TextRenderer::Anchored(_) => TargetKind::TextAnchored,
            TextRenderer::KeyValue(_) => TargetKind::TextKeyValue,
            TextRenderer::Aggregate(_) => TargetKind::TextAggregate,
        }
    }

    /// Renderer for `.xmi` metadata models.
    pub fn metadata() -> Self {
        TextRenderer::Anchored(AnchoredRenderer::new(AnchorPlan::TaggedValuePerKey {
            element: "CWM:TaggedValue".to_string(),
            tag_attribute: "tag".to_string(),
            value_attribute: "value".to_string(),
        }))
    }
}

impl FragmentRenderer for TextRenderer {
    fn render(&self, current: &str, section: &Section) -> Result<String, RenderError> {
        match self {
            TextRenderer::Whole(renderer) => renderer.render(current, section),
            TextRenderer::Anchored(renderer) => renderer.render(current, section),
            TextRenderer::KeyValue(renderer) => renderer.render(current, section),
            TextRenderer::Aggregate(renderer) => renderer.render(current, section),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAction {
    Text {
        section: SectionSource,
        location: TextLocation,
        renderer: TextRenderer,
    },
    Relational {
        table: TableSpec,
        mode: ReconcileMode,
        rows: RowSelection,
        /// An optional target with no selected rows is skipped, table check included.
        optional: bool,
    },
}

/// One registered target of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub name: &'static str,
    pub class: TargetClass,
    pub action: TargetAction,
}

impl TargetDescriptor {
    pub fn kind(&self) -> TargetKind {
        match &self.action {
            TargetAction::Text { renderer, .. } => renderer.kind(),
            TargetAction::Relational { .. } => TargetKind::RelationalRow,
        }
    }

    /// Whether this target consumes the named section.
    pub fn claims(&self, section: &str) -> bool {
        match &self.action {
            TargetAction::Text {
                section: SectionSource::Named(name),
                ..
            } => *name == section,
            TargetAction::Text { .. } => false,
            TargetAction::Relational {
                rows: RowSelection::Prefixed { prefix, .. },
                ..
            } => section.starts_with(prefix),
            TargetAction::Relational { .. } => false,
        }
    }
}

/// Picks the rows of a relational target out of the configuration.
///
/// Each entry is labelled with its section name. A section whose key field
/// is missing yields an error for that section only. `claimed` tells which
/// sections belong to other targets and is only consulted for
/// [`RowSelection::Unclaimed`].
pub fn select_rows(
    selection: RowSelection,
    table: &TableSpec,
    config: &CanonicalConfig,
    claimed: impl Fn(&str) -> bool,
) -> Vec<(String, Result<DesiredRow, TargetError>)> {
    config
        .sections()
        .filter_map(|(name, section)| {
            let row_name = match selection {
                RowSelection::Prefixed { prefix, key } => {
                    let suffix = name.strip_prefix(prefix)?;
                    row_key(key, table, name, suffix, section)
                }
                RowSelection::Unclaimed => {
                    if claimed(name) {
                        return None;
                    }
                    Ok(name.to_string())
                }
            };
            let row = row_name.map(|row_name| DesiredRow::new(row_name, section.clone()));
            Some((name.to_string(), row))
        })
        .collect()
}

fn row_key(
    key: RowKey,
    table: &TableSpec,
    name: &str,
    suffix: &str,
    section: &Section,
) -> Result<String, TargetError> {
    match key {
        RowKey::SectionName => Ok(name.to_string()),
        RowKey::PrefixStripped => Ok(suffix.to_string()),
        RowKey::Field(field) => section
            .get(field)
            .map(str::to_string)
            .ok_or_else(|| TargetError::RowKeyMissing {
                table: table.table.to_string(),
                section: name.to_string(),
                field: field.to_string(),
            }),
    }
}

fn install_file(
    name: &'static str,
    path: &'static str,
    renderer: TextRenderer,
) -> TargetDescriptor {
    TargetDescriptor {
        name,
        class: TargetClass::Files,
        action: TargetAction::Text {
            section: SectionSource::Named(name),
            location: TextLocation::InstallRelative(path),
            renderer,
        },
    }
}

fn platform_targets() -> Vec<TargetDescriptor> {
    let data_source_bean = Anchor::new(
        Bracket::element("bean").with_attribute("id", "dataSource"),
        AnchorTarget::Region,
    );

    vec![
        TargetDescriptor {
            name: "hibernate",
            class: TargetClass::Relational,
            action: TargetAction::Relational {
                table: DATASOURCE,
                mode: ReconcileMode::Replace,
                rows: RowSelection::Prefixed {
                    prefix: "hibernate",
                    key: RowKey::Field("name"),
                },
                optional: false,
            },
        },
        TargetDescriptor {
            name: "users",
            class: TargetClass::Relational,
            action: TargetAction::Relational {
                table: USERS,
                mode: ReconcileMode::Patch,
                rows: RowSelection::Prefixed {
                    prefix: "user:",
                    key: RowKey::PrefixStripped,
                },
                optional: true,
            },
        },
        install_file(
            "tomcat",
            "tomcat/webapps/pentaho/META-INF/context.xml",
            TextRenderer::Whole(WholeFileRenderer::new("xml")),
        ),
        install_file(
            "spring_xml",
            "pentaho-solutions/system/applicationContext-spring-security-jdbc.xml",
            TextRenderer::Anchored(AnchoredRenderer::new(AnchorPlan::Region {
                anchor: data_source_bean,
                value_key: "xml".to_string(),
            })),
        ),
        install_file(
            "mysql_hibernate",
            "pentaho-solutions/system/hibernate/mysql5.hibernate.cfg.xml",
            TextRenderer::Anchored(AnchoredRenderer::new(AnchorPlan::ElementPerKey {
                element: "property".to_string(),
                name_attribute: "name".to_string(),
            })),
        ),
        install_file(
            "spring_properties",
            "pentaho-solutions/system/applicationContext-spring-security-hibernate.properties",
            TextRenderer::KeyValue(KeyValueRenderer),
        ),
        install_file(
            "jdbc_properties",
            "pentaho-solutions/system/simple-jndi/jdbc.properties",
            TextRenderer::Aggregate(AggregateRenderer),
        ),
        install_file(
            "kettle",
            "pentaho-solutions/system/kettle/settings.xml",
            TextRenderer::Whole(WholeFileRenderer::new("xml")),
        ),
        install_file(
            "datasources",
            "pentaho-solutions/system/olap/datasources.xml",
            TextRenderer::Whole(
                WholeFileRenderer::new("xml")
                    .with_prologue(r#"<?xml version="1.0" encoding="UTF-8"?>"#),
            ),
        ),
    ]
}

fn repository_targets() -> Vec<TargetDescriptor> {
    vec![
        TargetDescriptor {
            name: "repositories",
            class: TargetClass::Files,
            action: TargetAction::Text {
                section: SectionSource::Connection,
                location: TextLocation::ConnectionPath("repositories"),
                renderer: TextRenderer::Anchored(AnchoredRenderer::new(
                    AnchorPlan::NamedChildPerKey {
                        container: "connection".to_string(),
                        name_element: "name".to_string(),
                        name_key: "name".to_string(),
                        skip_keys: vec!["db".to_string(), "repositories".to_string()],
                    },
                )),
            },
        },
        TargetDescriptor {
            name: "databases",
            class: TargetClass::Relational,
            action: TargetAction::Relational {
                table: R_DATABASE,
                mode: ReconcileMode::Patch,
                rows: RowSelection::Unclaimed,
                optional: false,
            },
        },
    ]
}
