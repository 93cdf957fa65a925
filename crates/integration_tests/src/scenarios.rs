use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canonical_config::CanonicalConfig;
use reconfigure_core::{Profile, RunSettings};
use tempfile::TempDir;
use test_utils::{
    create_kettle_catalog, create_platform_catalog, platform_config, read_row,
    repository_config, sqlite_url, write_config, InstallTree, REPOSITORIES_XML,
};

/// Backup suffix used by every scenario run.
pub const RUN_TIMESTAMP: &str = "2026.10.16-120000";

/// Initialize logging for tests
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}

/// An ETL repository deployment: `repositories.xml`, a seeded catalog and
/// a configuration patching `DB1` and `DB2`.
pub struct RepositoryScenario {
    dir: TempDir,
    pub config: PathBuf,
    pub catalog: PathBuf,
    pub repositories: PathBuf,
}

impl RepositoryScenario {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create scenario directory")?;
        let catalog = dir.path().join("repository.db");
        create_kettle_catalog(&catalog)?;
        let repositories = dir.path().join("repositories.xml");
        fs::write(&repositories, REPOSITORIES_XML)?;
        let config = write_config(
            dir.path(),
            "kettle.cfg",
            &repository_config(&sqlite_url(&catalog), &repositories),
        )?;
        Ok(Self {
            dir,
            config,
            catalog,
            repositories,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings::new(Profile::Repository, &self.config).with_timestamp(RUN_TIMESTAMP)
    }

    /// One column of an `R_DATABASE` row.
    pub fn column(&self, name: &str, column: &str) -> Result<Option<String>> {
        let row = read_row(&self.catalog, "R_DATABASE", "NAME", name)?
            .with_context(|| format!("Row {name} does not exist"))?;
        Ok(row.get(column).cloned().flatten())
    }

    pub fn repositories_text(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.repositories)?)
    }

    pub fn rewrite_config(&self, text: &str) -> Result<()> {
        fs::write(&self.config, text)?;
        Ok(())
    }
}

/// A BI platform deployment: a complete install tree, a seeded catalog and
/// a configuration covering every platform target.
pub struct PlatformScenario {
    pub install: InstallTree,
    dir: TempDir,
    pub config: PathBuf,
    pub catalog: PathBuf,
}

impl PlatformScenario {
    pub fn new() -> Result<Self> {
        let install = InstallTree::platform()?;
        let dir = TempDir::new().context("Failed to create scenario directory")?;
        let catalog = dir.path().join("hibernate.db");
        create_platform_catalog(&catalog)?;
        let config = write_config(
            dir.path(),
            "platform.cfg",
            &platform_config(&sqlite_url(&catalog)),
        )?;
        Ok(Self {
            install,
            dir,
            config,
            catalog,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings::new(Profile::Platform, &self.config)
            .with_install_root(self.install.root())
            .with_timestamp(RUN_TIMESTAMP)
    }

    /// The canonical configuration the scenario runs with.
    pub fn canonical(&self) -> Result<CanonicalConfig> {
        Ok(CanonicalConfig::read(&self.config)?)
    }
}
