//! Settings for the admin CLI. Read from an optional `clubledger.toml` in the
//! working directory, then from `CLUBLEDGER__*` environment variables
//! (`CLUBLEDGER__APP__LEVEL=debug`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::Sqlite(String::from("./clubledger.db"))
    }
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    String::from("info")
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub app: App,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("clubledger").required(false))
            .add_source(Environment::with_prefix("CLUBLEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(raw: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_to_a_local_sqlite_file() {
        let settings = from_toml("");
        assert_eq!(settings.database, Database::default());
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:./clubledger.db?mode=rwc");
    }

    #[test]
    fn reads_database_and_level() {
        let settings = from_toml(
            r#"
            database = { sqlite = "/var/lib/club.db" }

            [app]
            level = "debug"
            "#,
        );
        assert_eq!(settings.database, Database::Sqlite("/var/lib/club.db".into()));
        assert_eq!(settings.app.level, "debug");

        let settings = from_toml(r#"database = "memory""#);
        assert_eq!(settings.database.url(), "sqlite::memory:");
    }
}
