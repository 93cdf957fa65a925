//! The reconciliation run: validate everything, back up, then apply.

use std::fmt;
use std::path::{Path, PathBuf};

use canonical_config::{CanonicalConfig, Section, CONNECTION_SECTION};
use chrono::Local;
use tracing::{debug, error, info, instrument, warn};

use crate::backup::{run_timestamp, BackupManager};
use crate::catalog::{CatalogRepository, TableSpec};
use crate::discovery::discover_metadata;
use crate::dry_run::DryRunPolicy;
use crate::errors::{PreflightError, RepositoryError, TargetError};
use crate::outcome::{OutcomeStatus, RunReport, TargetKind, TargetOutcome};
use crate::paths::expand_home;
use crate::registry::{
    select_rows, Profile, RowSelection, SectionSource, TargetAction, TargetClass,
    TargetDescriptor, TextLocation, TextRenderer, METADATA_SUFFIX,
};
use crate::relational::{DesiredRow, ReconcileMode, RelationalReconciler, RowOutcome};
use crate::sqlite_catalog::SqliteCatalog;
use crate::text_target::TextTargetWriter;

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub profile: Profile,
    pub config_path: PathBuf,
    pub install_root: Option<PathBuf>,
    pub policy: DryRunPolicy,
    /// Restrict the run to one class of targets.
    pub only: Option<TargetClass>,
    /// Backup suffix to use instead of the current local time.
    pub timestamp: Option<String>,
}

impl RunSettings {
    pub fn new(profile: Profile, config_path: impl Into<PathBuf>) -> Self {
        Self {
            profile,
            config_path: config_path.into(),
            install_root: None,
            policy: DryRunPolicy::Apply,
            only: None,
            timestamp: None,
        }
    }

    pub fn with_install_root(mut self, install_root: impl Into<PathBuf>) -> Self {
        self.install_root = Some(install_root.into());
        self
    }

    pub fn with_policy(mut self, policy: DryRunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_only(mut self, only: Option<TargetClass>) -> Self {
        self.only = only;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    fn selects(&self, class: TargetClass) -> bool {
        self.only.map_or(true, |only| only == class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Validating,
    BackingUp,
    Applying,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Init => "INIT",
            RunPhase::Validating => "VALIDATING",
            RunPhase::BackingUp => "BACKING_UP",
            RunPhase::Applying => "APPLYING",
            RunPhase::Done => "DONE",
            RunPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Opens the catalog session named by the configuration.
pub trait CatalogConnector {
    fn connect(&self, url: &str) -> Result<Box<dyn CatalogRepository>, RepositoryError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl CatalogConnector for SqliteConnector {
    fn connect(&self, url: &str) -> Result<Box<dyn CatalogRepository>, RepositoryError> {
        Ok(Box::new(SqliteCatalog::open(url)?))
    }
}

impl<F> CatalogConnector for F
where
    F: Fn(&str) -> Result<Box<dyn CatalogRepository>, RepositoryError>,
{
    fn connect(&self, url: &str) -> Result<Box<dyn CatalogRepository>, RepositoryError> {
        self(url)
    }
}

struct PlannedText {
    name: String,
    path: PathBuf,
    section: Section,
    renderer: TextRenderer,
}

struct PlannedRelational {
    name: &'static str,
    table: TableSpec,
    mode: ReconcileMode,
    rows: Vec<(String, Result<DesiredRow, TargetError>)>,
}

enum CatalogState {
    NotNeeded,
    Open(Box<dyn CatalogRepository>),
    /// Opening failed; every row fails with this reason.
    Unavailable(String),
}

struct RunPlan {
    texts: Vec<PlannedText>,
    relational: Vec<PlannedRelational>,
    catalog: CatalogState,
}

/// Runs one profile against one configuration.
///
/// Validation is all-or-nothing: any [`PreflightError`] stops the run in
/// [`RunPhase::Failed`] before a single file or row is touched. After that
/// every target is applied independently and reported on its own.
pub struct ReconciliationDriver<C = SqliteConnector> {
    settings: RunSettings,
    connector: C,
    phase: RunPhase,
}

impl ReconciliationDriver<SqliteConnector> {
    pub fn new(settings: RunSettings) -> Self {
        Self::with_connector(settings, SqliteConnector)
    }
}

impl<C: CatalogConnector> ReconciliationDriver<C> {
    pub fn with_connector(settings: RunSettings, connector: C) -> Self {
        Self {
            settings,
            connector,
            phase: RunPhase::Init,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    #[instrument(skip(self), fields(profile = %self.settings.profile, dry_run = self.settings.policy.is_dry_run()))]
    pub fn run(&mut self) -> Result<RunReport, PreflightError> {
        self.transition(RunPhase::Validating);
        let plan = match self.validate() {
            Ok(plan) => plan,
            Err(e) => {
                error!(error = %e, "Pre-flight validation failed");
                self.transition(RunPhase::Failed);
                return Err(e);
            }
        };

        self.transition(RunPhase::BackingUp);
        let policy = self.settings.policy;
        let timestamp = self
            .settings
            .timestamp
            .clone()
            .unwrap_or_else(|| run_timestamp(Local::now()));
        let mut backups = BackupManager::new(policy, timestamp);
        let backup_failures: Vec<Option<TargetError>> = plan
            .texts
            .iter()
            .map(|text| {
                backups.snapshot(&text.path).err().map(|source| {
                    warn!(target_name = %text.name, error = %source, "Backup failed, target will not be written");
                    TargetError::Backup {
                        path: text.path.clone(),
                        source,
                    }
                })
            })
            .collect();

        self.transition(RunPhase::Applying);
        let mut outcomes = apply_relational(plan.relational, plan.catalog, policy);

        let writer = TextTargetWriter::new(policy);
        for (text, backup_failure) in plan.texts.into_iter().zip(backup_failures) {
            let kind = text.renderer.kind();
            let outcome = match backup_failure {
                Some(e) => TargetOutcome::failed(text.name, kind, &e),
                None => {
                    let result = writer.apply(&text.path, &text.renderer, &text.section);
                    TargetOutcome::from_write(text.name, kind, result)
                }
            };
            log_outcome(&outcome);
            outcomes.push(outcome);
        }

        self.transition(RunPhase::Done);
        let report = RunReport {
            profile: self.settings.profile.name().to_string(),
            dry_run: policy.is_dry_run(),
            outcomes,
            backups: backups.into_records(),
        };
        info!(summary = %report.summary(), "Run finished");
        Ok(report)
    }

    fn transition(&mut self, next: RunPhase) {
        info!(from = %self.phase, to = %next, "Run phase changed");
        self.phase = next;
    }

    fn validate(&self) -> Result<RunPlan, PreflightError> {
        let settings = &self.settings;
        let profile = settings.profile;

        debug!(path = ?settings.config_path, "Checking for configuration file");
        if !settings.config_path.is_file() {
            return Err(PreflightError::ConfigFileNotFound {
                path: settings.config_path.clone(),
            });
        }
        let mut config = CanonicalConfig::read(&settings.config_path)?;

        let connection = config.take_section(CONNECTION_SECTION).ok_or_else(|| {
            PreflightError::MissingConnection {
                section: CONNECTION_SECTION.to_string(),
            }
        })?;
        for key in profile.required_connection_keys() {
            connection_value(&connection, key)?;
        }

        let root = self.install_root()?;
        let targets = profile.targets();
        let claimed = |name: &str| {
            targets.iter().any(|target| target.claims(name))
                || (profile.discovers_metadata() && name.ends_with(METADATA_SUFFIX))
        };

        let mut texts = Vec::new();
        let mut relational = Vec::new();
        for target in &targets {
            if !settings.selects(target.class) {
                debug!(target_name = target.name, "Target not selected");
                continue;
            }

            match &target.action {
                TargetAction::Text {
                    section,
                    location,
                    renderer,
                } => {
                    let path = match location {
                        TextLocation::InstallRelative(relative) => root
                            .as_deref()
                            .ok_or_else(|| PreflightError::InstallRootRequired {
                                profile: profile.name().to_string(),
                            })?
                            .join(relative),
                        TextLocation::ConnectionPath(key) => {
                            expand_home(connection_value(&connection, key)?)
                        }
                    };
                    texts.push(plan_text(target, &path, section, renderer, &config, &connection)?);
                }
                TargetAction::Relational {
                    table,
                    mode,
                    rows,
                    optional,
                } => {
                    let selected = select_rows(*rows, table, &config, claimed);
                    if selected.is_empty() && *optional {
                        debug!(target_name = target.name, "No sections for optional target");
                        continue;
                    }
                    relational.push(PlannedRelational {
                        name: target.name,
                        table: *table,
                        mode: *mode,
                        rows: selected,
                    });
                }
            }
        }

        if profile.discovers_metadata() && settings.selects(TargetClass::Metadata) {
            if let Some(root) = root.as_deref() {
                for model in discover_metadata(root, &config)? {
                    let section = config.section(&model.section).cloned().ok_or_else(|| {
                        PreflightError::SectionMissing {
                            target: model.section.clone(),
                            section: model.section.clone(),
                        }
                    })?;
                    texts.push(PlannedText {
                        name: model.section,
                        path: model.path,
                        section,
                        renderer: TextRenderer::metadata(),
                    });
                }
            }
        }

        warn_unused_sections(&targets, &config, claimed);

        let catalog = if relational.is_empty() {
            CatalogState::NotNeeded
        } else {
            let url = connection_value(&connection, profile.catalog_url_key())?;
            self.open_catalog(url, &relational)?
        };

        info!(
            text_targets = texts.len(),
            relational_targets = relational.len(),
            "Pre-flight validation passed"
        );
        Ok(RunPlan {
            texts,
            relational,
            catalog,
        })
    }

    fn install_root(&self) -> Result<Option<PathBuf>, PreflightError> {
        let profile = self.settings.profile;
        let root = match &self.settings.install_root {
            Some(root) => root.clone(),
            None if profile.requires_install_root() => {
                return Err(PreflightError::InstallRootRequired {
                    profile: profile.name().to_string(),
                })
            }
            None => return Ok(None),
        };

        debug!(path = ?root, "Checking for install directory");
        if !root.is_dir() {
            return Err(PreflightError::InstallRootNotFound { path: root });
        }
        for directory in profile.required_layout() {
            if !root.join(directory).is_dir() {
                return Err(PreflightError::InstallLayoutInvalid {
                    path: root,
                    expected: format!("a {directory} directory"),
                });
            }
        }
        Ok(Some(root))
    }

    /// Opens the session and checks every table the run will write.
    ///
    /// A catalog that cannot be reached is not a pre-flight failure: file
    /// targets still run and each row reports the session as unavailable.
    /// A reachable catalog missing a table is.
    fn open_catalog(
        &self,
        url: &str,
        relational: &[PlannedRelational],
    ) -> Result<CatalogState, PreflightError> {
        let mut catalog = match self.connector.connect(url) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, relational targets will fail");
                return Ok(CatalogState::Unavailable(e.to_string()));
            }
        };

        for target in relational {
            match catalog.table_exists(&target.table) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(PreflightError::TableMissing {
                        target: target.name.to_string(),
                        table: target.table.table.to_string(),
                    })
                }
                Err(e) if e.is_connection_loss() => {
                    warn!(error = %e, "Catalog lost during table check");
                    return Ok(CatalogState::Unavailable(e.to_string()));
                }
                Err(e) => return Err(PreflightError::Catalog(e)),
            }
        }
        Ok(CatalogState::Open(catalog))
    }
}

fn connection_value<'a>(connection: &'a Section, key: &str) -> Result<&'a str, PreflightError> {
    connection
        .get(key)
        .ok_or_else(|| PreflightError::MissingConnectionKey {
            section: CONNECTION_SECTION.to_string(),
            key: key.to_string(),
        })
}

fn plan_text(
    target: &TargetDescriptor,
    path: &Path,
    source: &SectionSource,
    renderer: &TextRenderer,
    config: &CanonicalConfig,
    connection: &Section,
) -> Result<PlannedText, PreflightError> {
    debug!(target_name = target.name, path = ?path, "Checking target file exists");
    if !path.is_file() {
        return Err(PreflightError::TargetMissing {
            target: target.name.to_string(),
            location: path.display().to_string(),
        });
    }

    let section = match source {
        SectionSource::Named(name) => {
            config
                .section(name)
                .cloned()
                .ok_or_else(|| PreflightError::SectionMissing {
                    target: target.name.to_string(),
                    section: name.to_string(),
                })?
        }
        SectionSource::Connection => connection.clone(),
    };

    Ok(PlannedText {
        name: target.name.to_string(),
        path: path.to_path_buf(),
        section,
        renderer: renderer.clone(),
    })
}

fn warn_unused_sections(
    targets: &[TargetDescriptor],
    config: &CanonicalConfig,
    claimed: impl Fn(&str) -> bool,
) {
    let takes_rest = targets.iter().any(|target| {
        matches!(
            target.action,
            TargetAction::Relational {
                rows: RowSelection::Unclaimed,
                ..
            }
        )
    });
    if takes_rest {
        return;
    }

    for name in config.section_names().filter(|name| !claimed(name)) {
        warn!(section = name, "Section is not used by any target");
    }
}

fn apply_relational(
    targets: Vec<PlannedRelational>,
    catalog: CatalogState,
    policy: DryRunPolicy,
) -> Vec<TargetOutcome> {
    let outcomes = match catalog {
        CatalogState::NotNeeded => Vec::new(),
        CatalogState::Unavailable(reason) => targets
            .into_iter()
            .flat_map(|target| target.rows)
            .map(|(label, row)| {
                let error = match row {
                    Ok(_) => TargetError::SessionUnavailable {
                        reason: reason.clone(),
                    },
                    Err(e) => e,
                };
                TargetOutcome::failed(label, TargetKind::RelationalRow, &error)
            })
            .collect(),
        CatalogState::Open(mut repository) => {
            let mut reconciler = RelationalReconciler::new(&mut *repository, policy);
            let mut pending = Vec::new();
            for target in targets {
                let abandon = target.mode == ReconcileMode::Replace
                    && target.rows.iter().any(|(_, row)| row.is_err());
                let mut desired = Vec::new();
                for (label, row) in target.rows {
                    match row {
                        Ok(_) if abandon => pending.push(RowOutcome {
                            name: label,
                            result: Err(TargetError::ReplaceAbandoned {
                                table: target.table.table.to_string(),
                            }),
                        }),
                        Ok(row) => desired.push(row),
                        Err(e) => pending.push(RowOutcome {
                            name: label,
                            result: Err(e),
                        }),
                    }
                }
                if abandon {
                    warn!(target_name = target.name, "Replacement abandoned, table left unchanged");
                    continue;
                }
                if target.mode == ReconcileMode::Replace && desired.is_empty() {
                    pending.push(RowOutcome {
                        name: target.name.to_string(),
                        result: Err(TargetError::EmptyReplace {
                            table: target.table.table.to_string(),
                        }),
                    });
                    continue;
                }
                debug!(target_name = target.name, rows = desired.len(), "Reconciling rows");
                pending.extend(reconciler.reconcile(&target.table, target.mode, &desired));
            }
            reconciler.finish(pending)
        }
    };

    for outcome in &outcomes {
        log_outcome(outcome);
    }
    outcomes
}

fn log_outcome(outcome: &TargetOutcome) {
    match &outcome.status {
        OutcomeStatus::Failed(reason) => warn!(
            target_name = %outcome.target,
            kind = %outcome.kind,
            reason = %reason,
            "Target failed"
        ),
        status => info!(
            target_name = %outcome.target,
            kind = %outcome.kind,
            status = %status,
            "Target reconciled"
        ),
    }
}
