//! Temporary installation trees laid out like a BI platform install.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use walkdir::WalkDir;

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;

/// The platform files reconfigured by a run, relative to the install root,
/// with the content they start out with.
pub const PLATFORM_FILES: &[(&str, &str)] = &[
    (
        "tomcat/webapps/pentaho/META-INF/context.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Context path="/pentaho" docbase="webapps/pentaho/">
</Context>
"#,
    ),
    (
        "pentaho-solutions/system/applicationContext-spring-security-jdbc.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<beans>
  <bean id="userCache" class="org.springframework.security.providers.dao.cache.NullUserCache" />
  <bean id="dataSource" class="org.springframework.jdbc.datasource.DriverManagerDataSource">
    <property name="url" value="jdbc:hsqldb:hsql://localhost:9001/hibernate" />
  </bean>
</beans>
"#,
    ),
    (
        "pentaho-solutions/system/hibernate/mysql5.hibernate.cfg.xml",
        r#"<?xml version='1.0' encoding='utf-8'?>
<hibernate-configuration>
  <session-factory>
    <property name="connection.driver_class">com.mysql.jdbc.Driver</property>
    <property name="connection.url">jdbc:mysql://localhost:3306/hibernate</property>
    <property name="dialect">org.hibernate.dialect.MySQL5InnoDBDialect</property>
    <property name="connection.username">hibuser</property>
    <property name="connection.password">password</property>
  </session-factory>
</hibernate-configuration>
"#,
    ),
    (
        "pentaho-solutions/system/applicationContext-spring-security-hibernate.properties",
        "jdbc.driver=org.hsqldb.jdbcDriver\njdbc.url=jdbc:hsqldb:hsql://localhost:9001/hibernate\n",
    ),
    (
        "pentaho-solutions/system/simple-jndi/jdbc.properties",
        "SampleData/type=javax.sql.DataSource\nSampleData/driver=org.hsqldb.jdbcDriver\n",
    ),
    (
        "pentaho-solutions/system/kettle/settings.xml",
        "<kettle-repository>\n<repository.type>files</repository.type>\n</kettle-repository>\n",
    ),
    (
        "pentaho-solutions/system/olap/datasources.xml",
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<DataSources>\n</DataSources>\n",
    ),
];

/// A metadata model with the connection tagged values a run rewrites.
pub const XMI_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<XMI xmi.version = '1.2'>
  <CWM:Parameter>
    <CWM:TaggedValue xmi.id = 'a1' tag = 'DATABASE_SERVER' value = 'old.host'/>
    <CWM:TaggedValue xmi.id = 'a2' tag = 'DATABASE_PORT' value = '1521'/>
    <CWM:TaggedValue xmi.id = 'a3' tag = 'DATABASE_TYPE' value = 'ORACLE'/>
  </CWM:Parameter>
</XMI>
"#;

/// An ETL `repositories.xml` with two connections, `Other Repo` first.
pub const REPOSITORIES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repositories>
  <connection>
    <name>Other Repo</name>
    <server>other-host</server>
    <port>5432</port>
  </connection>
  <connection>
    <name>OTI Kettle</name>
    <server>old-host</server>
    <type>MYSQL</type>
    <database>kettle_old</database>
    <port>3306</port>
    <username>etl</username>
    <password/>
  </connection>
</repositories>
"#;

/// A temporary directory removed when dropped.
pub struct InstallTree {
    dir: TempDir,
}

impl InstallTree {
    pub fn empty() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create install directory")?,
        })
    }

    /// Creates a complete platform install: every file of [`PLATFORM_FILES`]
    /// plus `pentaho-solutions/oti/metadata.xmi`.
    pub fn platform() -> Result<Self> {
        let tree = Self::empty()?;
        for (relative, content) in PLATFORM_FILES {
            tree.write(relative, content)?;
        }
        tree.write("pentaho-solutions/oti/metadata.xmi", XMI_MODEL)?;
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Writes a file, creating its parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.path(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn remove(&self, relative: &str) -> Result<()> {
        let path = self.path(relative);
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))
    }

    /// Every file under the root with its bytes, keyed by relative path.
    pub fn snapshot(&self) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(self.root()) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(self.root())?.to_path_buf();
            files.insert(relative, fs::read(entry.path())?);
        }
        Ok(files)
    }
}
