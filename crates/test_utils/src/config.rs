//! Canonical configuration texts for the fixtures in this crate.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Builds configuration text section by section.
///
/// Multi-line values are written as continuation lines indented by four
/// spaces.
///
/// # Examples
///
/// ```
/// use test_utils::ConfigBuilder;
///
/// let text = ConfigBuilder::new()
///     .section("DB1", &[("host_name", "localhost"), ("port", "3306")])
///     .build();
/// assert_eq!(text, "[DB1]\nhost_name: localhost\nport: 3306\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    text: String,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, name: &str, entries: &[(&str, &str)]) -> Self {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        let _ = writeln!(self.text, "[{name}]");
        for (key, value) in entries {
            let mut lines = value.lines();
            match lines.next() {
                Some(first) => {
                    let _ = writeln!(self.text, "{key}: {first}");
                }
                None => {
                    let _ = writeln!(self.text, "{key}:");
                }
            }
            for line in lines {
                let _ = writeln!(self.text, "    {line}");
            }
        }
        self
    }

    pub fn build(self) -> String {
        self.text
    }
}

/// Writes configuration text to `dir/name` and returns the path.
pub fn write_config(dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// A platform configuration covering every platform target, one datasource
/// (`Moodle`), one user (`admin`) and the `oti/metadata.xmi` model.
pub fn platform_config(catalog_url: &str) -> String {
    ConfigBuilder::new()
        .section("CONNECTION", &[("hibernate", catalog_url)])
        .section(
            "hibernate0",
            &[
                ("name", "Moodle"),
                ("maxactconn", "20"),
                ("driverclass", "com.mysql.jdbc.Driver"),
                ("idleconn", "5"),
                ("username", "root"),
                ("password", "letmein"),
                ("url", "jdbc:mysql://localhost:3306/moodle"),
                ("wait", "1000"),
                ("query", ""),
            ],
        )
        .section(
            "user:admin",
            &[
                ("password", "secret"),
                ("description", "BI administrator"),
                ("enabled", "yes"),
            ],
        )
        .section(
            "spring_xml",
            &[(
                "xml",
                "<bean id=\"dataSource\" class=\"org.springframework.jdbc.datasource.DriverManagerDataSource\">\n\
                 <property name=\"url\" value=\"jdbc:mysql://db.example:3306/hibernate\" />\n\
                 </bean>",
            )],
        )
        .section(
            "mysql_hibernate",
            &[
                ("connection.url", "jdbc:mysql://db.example:3306/hibernate"),
                ("connection.username", "bi"),
                ("connection.password", "secret"),
            ],
        )
        .section(
            "spring_properties",
            &[
                ("jdbc.driver", "com.mysql.jdbc.Driver"),
                ("jdbc.url", "jdbc:mysql://db.example:3306/hibernate"),
            ],
        )
        .section(
            "jdbc_properties",
            &[
                (
                    "datasource[0]",
                    "Hibernate/type=javax.sql.DataSource\nHibernate/driver=com.mysql.jdbc.Driver",
                ),
                ("datasource[1]", "Quartz/type=javax.sql.DataSource"),
            ],
        )
        .section(
            "tomcat",
            &[(
                "xml",
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <Context path=\"/pentaho\" docbase=\"webapps/pentaho/\">\n\
                 <Resource name=\"jdbc/Hibernate\" url=\"jdbc:mysql://db.example:3306/hibernate\"/>\n\
                 </Context>",
            )],
        )
        .section(
            "kettle",
            &[(
                "xml",
                "<kettle-repository>\n\
                 <repository.type>rdbms</repository.type>\n\
                 <repository.name>A_REPO</repository.name>\n\
                 </kettle-repository>",
            )],
        )
        .section(
            "datasources",
            &[(
                "xml",
                "<DataSources>\n\
                 <DataSourceName>Provider=Mondrian;DataSource=Pentaho</DataSourceName>\n\
                 </DataSources>",
            )],
        )
        .section(
            "oti/metadata.xmi",
            &[("database_server", "db.example"), ("database_port", "3306")],
        )
        .build()
}

/// A repository configuration for the `OTI Kettle` connection and the
/// `DB1` and `DB2` catalog rows.
pub fn repository_config(catalog_url: &str, repositories_path: &Path) -> String {
    let repositories = repositories_path.display().to_string();
    ConfigBuilder::new()
        .section(
            "CONNECTION",
            &[
                ("db", catalog_url),
                ("repositories", &repositories),
                ("name", "OTI Kettle"),
                ("server", "db.example"),
                ("database", "kettle"),
                ("password", "Encrypted 2be98afc86aa7f2e4cb15ab64d397a6d4"),
            ],
        )
        .section(
            "DB1",
            &[
                ("host_name", "localhost"),
                ("database_name", "db2"),
                ("port", "3306"),
                ("username", "root"),
                ("password", "letmein"),
            ],
        )
        .section(
            "DB2",
            &[
                ("host_name", "localhost"),
                ("database_name", "db1"),
                ("port", "3306"),
            ],
        )
        .build()
}
