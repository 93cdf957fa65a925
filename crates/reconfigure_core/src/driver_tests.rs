use super::*;
use std::fs;
use tempfile::TempDir;
use test_utils::{
    count_rows, create_kettle_catalog, create_platform_catalog, platform_config, read_row,
    repository_config, sqlite_url, write_config, ConfigBuilder, InstallTree, REPOSITORIES_XML,
    XMI_MODEL,
};
use tracing_test::traced_test;

use crate::memory_catalog::InMemoryCatalog;

const TIMESTAMP: &str = "2026.10.16-120000";

struct RepositoryFixture {
    dir: TempDir,
    config: PathBuf,
    catalog: PathBuf,
    repositories: PathBuf,
}

impl RepositoryFixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let catalog = dir.path().join("repository.db");
        create_kettle_catalog(&catalog).expect("Failed to create catalog");
        let repositories = dir.path().join("repositories.xml");
        fs::write(&repositories, REPOSITORIES_XML).expect("Failed to write repositories");
        let text = repository_config(&sqlite_url(&catalog), &repositories);
        let config = write_config(dir.path(), "kettle.cfg", &text).expect("Failed to write config");
        Self {
            dir,
            config,
            catalog,
            repositories,
        }
    }

    fn settings(&self) -> RunSettings {
        RunSettings::new(Profile::Repository, &self.config).with_timestamp(TIMESTAMP)
    }

    fn column(&self, name: &str, column: &str) -> Option<String> {
        read_row(&self.catalog, "R_DATABASE", "NAME", name)
            .expect("Failed to read catalog")
            .expect("Row should exist")[column]
            .clone()
    }

    fn repositories_text(&self) -> String {
        fs::read_to_string(&self.repositories).expect("Failed to read repositories")
    }
}

struct PlatformFixture {
    install: InstallTree,
    _dir: TempDir,
    config: PathBuf,
    catalog: PathBuf,
}

impl PlatformFixture {
    fn new() -> Self {
        Self::with_extra("")
    }

    fn with_extra(extra: &str) -> Self {
        let install = InstallTree::platform().expect("Failed to create install tree");
        let dir = TempDir::new().expect("Failed to create temp directory");
        let catalog = dir.path().join("hibernate.db");
        create_platform_catalog(&catalog).expect("Failed to create catalog");
        let text = format!("{}{extra}", platform_config(&sqlite_url(&catalog)));
        let config = write_config(dir.path(), "platform.cfg", &text).expect("Failed to write config");
        Self {
            install,
            _dir: dir,
            config,
            catalog,
        }
    }

    fn settings(&self) -> RunSettings {
        RunSettings::new(Profile::Platform, &self.config)
            .with_install_root(self.install.root())
            .with_timestamp(TIMESTAMP)
    }
}

fn statuses(report: &RunReport) -> Vec<(String, OutcomeStatus)> {
    report
        .outcomes
        .iter()
        .map(|outcome| (outcome.target.clone(), outcome.status.clone()))
        .collect()
}

fn refuse_connection(_url: &str) -> Result<Box<dyn CatalogRepository>, RepositoryError> {
    Err(RepositoryError::Connection("connection refused".to_string()))
}

fn catalog_without_tables(_url: &str) -> Result<Box<dyn CatalogRepository>, RepositoryError> {
    Ok(Box::new(InMemoryCatalog::new()))
}

#[test]
fn test_repository_run_applies_rows_then_files() {
    let fixture = RepositoryFixture::new();
    let mut driver = ReconciliationDriver::new(fixture.settings());
    assert_eq!(driver.phase(), RunPhase::Init);

    let report = driver.run().unwrap();

    assert_eq!(driver.phase(), RunPhase::Done);
    assert_eq!(
        statuses(&report),
        vec![
            ("DB1".to_string(), OutcomeStatus::Applied),
            ("DB2".to_string(), OutcomeStatus::Applied),
            ("repositories".to_string(), OutcomeStatus::Applied),
        ]
    );
    assert_eq!(report.outcomes[2].kind, TargetKind::TextAnchored);
    assert_eq!(report.exit_code(), 0);

    assert_eq!(fixture.column("DB1", "HOST_NAME").as_deref(), Some("localhost"));
    assert_eq!(fixture.column("DB1", "DATABASE_NAME").as_deref(), Some("db2"));
    assert_eq!(fixture.column("DB1", "PORT").as_deref(), Some("3306"));
    assert_eq!(
        fixture.column("DB1", "PASSWORD").as_deref(),
        Some("Encrypted 2be98afc86aa7f2e4cb15ab64d397a6d4")
    );
    assert_eq!(fixture.column("DB2", "DATABASE_NAME").as_deref(), Some("db1"));
    assert_eq!(fixture.column("DB2", "USERNAME").as_deref(), Some("etl"));

    let repositories = fixture.repositories_text();
    assert!(repositories.contains("<server>other-host</server>"));
    assert!(repositories.contains("<server>db.example</server>"));
    assert!(repositories.contains("<database>kettle</database>"));
    assert!(repositories.contains("<password>Encrypted 2be98afc86aa7f2e4cb15ab64d397a6d4</password>"));
    assert!(repositories.contains("<username>etl</username>"));
}

#[test]
fn test_backup_holds_content_from_before_the_run() {
    let fixture = RepositoryFixture::new();

    let report = ReconciliationDriver::new(fixture.settings()).run().unwrap();

    assert_eq!(report.backups.len(), 1);
    let record = &report.backups[0];
    assert!(record.written);
    assert_eq!(record.timestamp, TIMESTAMP);
    let expected = fixture.dir.path().join(format!("repositories.xml.{TIMESTAMP}"));
    assert_eq!(
        fs::read_to_string(expected).expect("Snapshot should exist"),
        REPOSITORIES_XML
    );
}

#[test]
fn test_existing_snapshot_is_never_replaced() {
    let fixture = RepositoryFixture::new();
    ReconciliationDriver::new(fixture.settings()).run().unwrap();
    let after_first = fixture.repositories_text();

    let report = ReconciliationDriver::new(fixture.settings()).run().unwrap();

    let repositories = report
        .outcomes
        .iter()
        .find(|outcome| outcome.target == "repositories")
        .unwrap();
    assert!(repositories.status.is_failure());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(fixture.repositories_text(), after_first);
    let snapshot = fixture.dir.path().join(format!("repositories.xml.{TIMESTAMP}"));
    assert_eq!(fs::read_to_string(snapshot).unwrap(), REPOSITORIES_XML);
}

#[test]
fn test_dry_run_reports_skips_and_touches_nothing() {
    let fixture = RepositoryFixture::new();
    let before = fs::read(&fixture.catalog).unwrap();
    let settings = fixture.settings().with_policy(DryRunPolicy::DryRun);

    let report = ReconciliationDriver::new(settings).run().unwrap();

    assert!(report.dry_run);
    assert!(report
        .outcomes
        .iter()
        .all(|outcome| outcome.status == OutcomeStatus::SkippedDryRun));
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.exit_code(), 0);

    assert_eq!(fixture.repositories_text(), REPOSITORIES_XML);
    assert_eq!(fixture.column("DB1", "HOST_NAME").as_deref(), Some("old-host"));
    assert_eq!(fs::read(&fixture.catalog).unwrap(), before);
    assert_eq!(report.backups.len(), 1);
    assert!(!report.backups[0].written);
    assert!(!report.backups[0].snapshot_path.exists());
}

#[test]
fn test_missing_config_file_fails_validation() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let settings = RunSettings::new(Profile::Repository, temp_dir.path().join("absent.cfg"));
    let mut driver = ReconciliationDriver::new(settings);

    let result = driver.run();

    assert!(matches!(result, Err(PreflightError::ConfigFileNotFound { .. })));
    assert_eq!(driver.phase(), RunPhase::Failed);
}

#[test]
fn test_missing_connection_key_fails_validation() {
    let fixture = RepositoryFixture::new();
    let text = ConfigBuilder::new()
        .section("CONNECTION", &[("db", &sqlite_url(&fixture.catalog))])
        .section("DB1", &[("host_name", "localhost")])
        .build();
    fs::write(&fixture.config, text).unwrap();

    let result = ReconciliationDriver::new(fixture.settings()).run();

    match result {
        Err(PreflightError::MissingConnectionKey { key, .. }) => assert_eq!(key, "repositories"),
        other => panic!("Expected MissingConnectionKey, got {:?}", other),
    }
    assert_eq!(fixture.column("DB1", "HOST_NAME").as_deref(), Some("old-host"));
}

#[test]
fn test_missing_target_file_aborts_before_any_change() {
    let fixture = RepositoryFixture::new();
    fs::remove_file(&fixture.repositories).unwrap();
    let mut driver = ReconciliationDriver::new(fixture.settings());

    let result = driver.run();

    match result {
        Err(PreflightError::TargetMissing { target, .. }) => assert_eq!(target, "repositories"),
        other => panic!("Expected TargetMissing, got {:?}", other),
    }
    assert_eq!(driver.phase(), RunPhase::Failed);
    assert_eq!(fixture.column("DB1", "HOST_NAME").as_deref(), Some("old-host"));
    assert!(!fixture
        .dir
        .path()
        .join(format!("repositories.xml.{TIMESTAMP}"))
        .exists());
}

#[test]
fn test_unreachable_catalog_fails_rows_but_writes_files() {
    let fixture = RepositoryFixture::new();
    let mut driver = ReconciliationDriver::with_connector(fixture.settings(), refuse_connection);

    let report = driver.run().unwrap();

    assert_eq!(driver.phase(), RunPhase::Done);
    let summary = report.summary();
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.applied, 1);
    match &report.outcomes[0].status {
        OutcomeStatus::Failed(reason) => {
            assert!(reason.contains("Relational session unavailable"));
            assert!(reason.contains("connection refused"));
        }
        other => panic!("Expected a failed row, got {:?}", other),
    }
    assert!(fixture.repositories_text().contains("<server>db.example</server>"));
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_missing_table_fails_validation() {
    let fixture = RepositoryFixture::new();

    let result = ReconciliationDriver::with_connector(fixture.settings(), catalog_without_tables).run();

    match result {
        Err(PreflightError::TableMissing { table, .. }) => assert_eq!(table, "R_DATABASE"),
        other => panic!("Expected TableMissing, got {:?}", other),
    }
    assert_eq!(fixture.repositories_text(), REPOSITORIES_XML);
}

#[test]
fn test_only_files_leaves_catalog_alone() {
    let fixture = RepositoryFixture::new();
    let settings = fixture.settings().with_only(Some(TargetClass::Files));

    let report = ReconciliationDriver::with_connector(settings, refuse_connection)
        .run()
        .unwrap();

    assert_eq!(
        statuses(&report),
        vec![("repositories".to_string(), OutcomeStatus::Applied)]
    );
    assert_eq!(fixture.column("DB1", "HOST_NAME").as_deref(), Some("old-host"));
}

#[test]
fn test_only_relational_takes_no_backups() {
    let fixture = RepositoryFixture::new();
    let settings = fixture.settings().with_only(Some(TargetClass::Relational));

    let report = ReconciliationDriver::new(settings).run().unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.backups.is_empty());
    assert_eq!(fixture.repositories_text(), REPOSITORIES_XML);
    assert_eq!(fixture.column("DB1", "HOST_NAME").as_deref(), Some("localhost"));
}

#[test]
fn test_platform_run_reconciles_every_target() {
    let fixture = PlatformFixture::new();

    let report = ReconciliationDriver::new(fixture.settings()).run().unwrap();

    let targets: Vec<String> = report.outcomes.iter().map(|o| o.target.clone()).collect();
    assert_eq!(
        targets,
        vec![
            "hibernate0",
            "user:admin",
            "tomcat",
            "spring_xml",
            "mysql_hibernate",
            "spring_properties",
            "jdbc_properties",
            "kettle",
            "datasources",
            "oti/metadata.xmi",
        ]
    );
    assert!(!report.has_failures(), "{:?}", report.outcomes);
    assert_eq!(report.backups.len(), 8);

    assert_eq!(count_rows(&fixture.catalog, "DATASOURCE").unwrap(), 1);
    let moodle = read_row(&fixture.catalog, "DATASOURCE", "NAME", "Moodle")
        .unwrap()
        .expect("Moodle should be inserted");
    assert_eq!(moodle["PASSWORD"].as_deref(), Some("bGV0bWVpbg=="));
    assert_eq!(moodle["MAXACTCONN"].as_deref(), Some("20"));
    let admin = read_row(&fixture.catalog, "USERS", "USERNAME", "admin")
        .unwrap()
        .unwrap();
    assert_eq!(admin["PASSWORD"].as_deref(), Some("c2VjcmV0"));
    assert_eq!(admin["ENABLED"].as_deref(), Some("1"));
    assert_eq!(count_rows(&fixture.catalog, "USERS").unwrap(), 2);

    let install = &fixture.install;
    assert_eq!(
        install
            .read("pentaho-solutions/system/applicationContext-spring-security-hibernate.properties")
            .unwrap(),
        "jdbc.driver=com.mysql.jdbc.Driver\njdbc.url=jdbc:mysql://db.example:3306/hibernate\n"
    );
    assert_eq!(
        install.read("pentaho-solutions/system/simple-jndi/jdbc.properties").unwrap(),
        "Hibernate/type=javax.sql.DataSource\nHibernate/driver=com.mysql.jdbc.Driver\nQuartz/type=javax.sql.DataSource\n"
    );
    assert!(install
        .read("pentaho-solutions/system/olap/datasources.xml")
        .unwrap()
        .starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<DataSources>\n"));

    let hibernate = install
        .read("pentaho-solutions/system/hibernate/mysql5.hibernate.cfg.xml")
        .unwrap();
    assert!(hibernate.contains("<property name=\"connection.username\">bi</property>"));
    assert!(hibernate.contains("<property name=\"dialect\">org.hibernate.dialect.MySQL5InnoDBDialect</property>"));

    let spring = install
        .read("pentaho-solutions/system/applicationContext-spring-security-jdbc.xml")
        .unwrap();
    assert!(spring.contains("jdbc:mysql://db.example:3306/hibernate"));
    assert!(spring.contains("<bean id=\"userCache\""));

    let model = install.read("pentaho-solutions/oti/metadata.xmi").unwrap();
    assert!(model.contains("tag = 'DATABASE_SERVER' value = 'db.example'"));
    assert!(model.contains("tag = 'DATABASE_PORT' value = '3306'"));
    assert!(model.contains("tag = 'DATABASE_TYPE' value = 'ORACLE'"));
}

#[test]
fn test_platform_rerun_changes_nothing() {
    let fixture = PlatformFixture::new();
    ReconciliationDriver::new(fixture.settings()).run().unwrap();
    let first = fixture.install.read("pentaho-solutions/oti/metadata.xmi").unwrap();
    let files = [
        "tomcat/webapps/pentaho/META-INF/context.xml",
        "pentaho-solutions/system/applicationContext-spring-security-jdbc.xml",
        "pentaho-solutions/system/hibernate/mysql5.hibernate.cfg.xml",
        "pentaho-solutions/system/kettle/settings.xml",
    ];
    let contents: Vec<String> = files.iter().map(|f| fixture.install.read(f).unwrap()).collect();

    let settings = fixture.settings().with_timestamp("2026.10.16-130000");
    let report = ReconciliationDriver::new(settings).run().unwrap();

    assert!(!report.has_failures());
    assert_eq!(fixture.install.read("pentaho-solutions/oti/metadata.xmi").unwrap(), first);
    for (file, content) in files.iter().zip(contents) {
        assert_eq!(fixture.install.read(file).unwrap(), content, "{file} changed");
    }
}

#[test]
fn test_platform_requires_install_root() {
    let fixture = PlatformFixture::new();
    let settings = RunSettings::new(Profile::Platform, &fixture.config);

    let result = ReconciliationDriver::new(settings).run();

    assert!(matches!(result, Err(PreflightError::InstallRootRequired { .. })));
}

#[test]
fn test_install_without_tomcat_is_rejected() {
    let fixture = PlatformFixture::new();
    let empty = InstallTree::empty().unwrap();
    let settings = fixture.settings().with_install_root(empty.root());

    let result = ReconciliationDriver::new(settings).run();

    assert!(matches!(result, Err(PreflightError::InstallLayoutInvalid { .. })));
}

#[test]
fn test_configured_model_without_file_fails_validation() {
    let fixture = PlatformFixture::new();
    fixture.install.remove("pentaho-solutions/oti/metadata.xmi").unwrap();

    let result = ReconciliationDriver::new(fixture.settings()).run();

    match result {
        Err(PreflightError::TargetMissing { target, .. }) => assert_eq!(target, "oti/metadata.xmi"),
        other => panic!("Expected TargetMissing, got {:?}", other),
    }
    assert_eq!(count_rows(&fixture.catalog, "DATASOURCE").unwrap(), 1);
    assert!(read_row(&fixture.catalog, "DATASOURCE", "NAME", "SampleData")
        .unwrap()
        .is_some());
}

#[test]
fn test_only_metadata_touches_models_only() {
    let fixture = PlatformFixture::new();
    let settings = fixture.settings().with_only(Some(TargetClass::Metadata));

    let report = ReconciliationDriver::new(settings).run().unwrap();

    assert_eq!(
        statuses(&report),
        vec![("oti/metadata.xmi".to_string(), OutcomeStatus::Applied)]
    );
    assert_ne!(
        fixture.install.read("pentaho-solutions/oti/metadata.xmi").unwrap(),
        XMI_MODEL
    );
    assert!(read_row(&fixture.catalog, "DATASOURCE", "NAME", "SampleData")
        .unwrap()
        .is_some());
}

#[traced_test]
#[test]
fn test_unused_section_is_reported() {
    let fixture = PlatformFixture::with_extra("\n[leftover]\nkey: value\n");

    let report = ReconciliationDriver::new(fixture.settings()).run().unwrap();

    assert!(!report.has_failures());
    assert!(logs_contain("Section is not used by any target"));
    assert!(logs_contain("leftover"));
}

#[test]
fn test_invalid_data_source_keeps_existing_rows() {
    let fixture = PlatformFixture::with_extra("\n[hibernate1]\nurl: jdbc:mysql://db.example:3306/quartz\n");

    let report = ReconciliationDriver::new(fixture.settings()).run().unwrap();

    let outcomes = statuses(&report);
    assert_eq!(
        outcomes[0],
        (
            "hibernate0".to_string(),
            OutcomeStatus::Failed(
                "Replacement of DATASOURCE abandoned because another row is invalid; table left unchanged"
                    .to_string()
            )
        )
    );
    assert_eq!(
        outcomes[1],
        (
            "hibernate1".to_string(),
            OutcomeStatus::Failed(
                "Section [hibernate1] has no 'name' to identify its DATASOURCE row".to_string()
            )
        )
    );
    assert_eq!(outcomes[2], ("user:admin".to_string(), OutcomeStatus::Applied));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(count_rows(&fixture.catalog, "DATASOURCE").unwrap(), 1);
    assert!(read_row(&fixture.catalog, "DATASOURCE", "NAME", "SampleData")
        .unwrap()
        .is_some());
}

#[test]
fn test_platform_without_data_sources_does_not_clear_table() {
    let fixture = PlatformFixture::new();
    let text = fs::read_to_string(&fixture.config)
        .unwrap()
        .replace("[hibernate0]", "[moodle]");
    fs::write(&fixture.config, text).unwrap();

    let report = ReconciliationDriver::new(fixture.settings()).run().unwrap();

    assert_eq!(
        statuses(&report)[0],
        (
            "hibernate".to_string(),
            OutcomeStatus::Failed(
                "No rows configured to replace DATASOURCE; table left unchanged".to_string()
            )
        )
    );
    assert_eq!(report.exit_code(), 1);
    assert_eq!(count_rows(&fixture.catalog, "DATASOURCE").unwrap(), 1);
}
