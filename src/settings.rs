use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const ENV_PREFIX: &str = "PUSH_DISPATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct WebserverSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum CoreDatabaseSettings {
    InMemory,
    Sqlite { path: String },
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub core: CoreDatabaseSettings,
    /// Maximum number of emails bound into a single `IN (...)` lookup
    #[serde(default = "default_lookup_chunk_size")]
    pub lookup_chunk_size: usize,
}

fn default_lookup_chunk_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum PushSettings {
    Dummy,
    Fcm {
        /// Path to the Google service account JSON key
        service_account_key: String,
        /// Overrides the project id named in the service account key
        #[serde(default)]
        project_id: Option<String>,
        #[serde(default = "default_fcm_base_url")]
        base_url: String,
    },
    Apns {
        team_id: String,
        key_id: String,
        bundle_id: String,
        #[serde(rename = "private_key")]
        private_key_path: String,
    },
}

fn default_fcm_base_url() -> String {
    "https://fcm.googleapis.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub development: bool,
    pub webserver: WebserverSettings,
    pub database: DatabaseSettings,
    pub push: PushSettings,
}

impl Settings {
    pub fn load() -> Result<Settings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .and_then(|config| config.try_deserialize())
            .expect("settings should parse")
    }

    #[test]
    fn test_parses_sqlite_and_fcm() {
        let settings = parse(
            r#"
            development = false

            [webserver]
            host = "0.0.0.0"
            port = 8080

            [database.core]
            type = "sqlite"
            path = "sqlite:data/accounts.db"

            [push]
            type = "fcm"
            service_account_key = "secrets/firebase.json"
            "#,
        );

        assert!(!settings.development);
        assert_eq!(settings.webserver.port, 8080);
        assert_eq!(settings.database.lookup_chunk_size, 500);
        assert!(matches!(
            settings.database.core,
            CoreDatabaseSettings::Sqlite { ref path } if path == "sqlite:data/accounts.db"
        ));
        match settings.push {
            PushSettings::Fcm {
                service_account_key,
                project_id,
                base_url,
            } => {
                assert_eq!(service_account_key, "secrets/firebase.json");
                assert_eq!(project_id, None);
                assert_eq!(base_url, "https://fcm.googleapis.com");
            }
            other => panic!("unexpected push settings: {other:?}"),
        }
    }

    #[test]
    fn test_parses_fcm_project_override() {
        let settings = parse(
            r#"
            development = false

            [webserver]
            host = "0.0.0.0"
            port = 8080

            [database.core]
            type = "inmemory"

            [push]
            type = "fcm"
            service_account_key = "secrets/firebase.json"
            project_id = "other-project"
            base_url = "http://localhost:9099"
            "#,
        );

        match settings.push {
            PushSettings::Fcm {
                project_id,
                base_url,
                ..
            } => {
                assert_eq!(project_id.as_deref(), Some("other-project"));
                assert_eq!(base_url, "http://localhost:9099");
            }
            other => panic!("unexpected push settings: {other:?}"),
        }
    }

    #[test]
    fn test_parses_inmemory_and_dummy() {
        let settings = parse(
            r#"
            development = true

            [webserver]
            host = "127.0.0.1"
            port = 48080

            [database]
            lookup_chunk_size = 30

            [database.core]
            type = "inmemory"

            [push]
            type = "dummy"
            "#,
        );

        assert_eq!(settings.database.lookup_chunk_size, 30);
        assert!(matches!(settings.database.core, CoreDatabaseSettings::InMemory));
        assert!(matches!(settings.push, PushSettings::Dummy));
    }
}
