use crate::error::ConfigError;
use crate::storage::default_db_path;
use crate::utils::normalize_url;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const CONFIG_ENV: &str = "ODOO_SYNC_CONFIG";
const DEFAULT_MODEL: &str = "res.partner";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// On-disk shape of `odoo-sync.toml`. Every key is optional here; required
/// ones are checked by [`SyncConfig::from_file`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl ConfigFile {
    pub fn default_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("odoo-sync.toml"))
    }

    /// Reads `$ODOO_SYNC_CONFIG` (or the platform default path) and applies
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) => PathBuf::from(p),
            None => Self::default_path().ok_or(ConfigError::NoConfigDir)?,
        };
        Ok(Self::read(&path)?.with_overrides(|key| std::env::var(key).ok()))
    }

    /// A missing file is an empty config; environment variables may still fill it.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Non-empty `ODOO_URL`, `ODOO_DB`, `ODOO_USERNAME`, `ODOO_PASSWORD` win over the file.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = pick("ODOO_URL") {
            self.url = Some(v);
        }
        if let Some(v) = pick("ODOO_DB") {
            self.database = Some(v);
        }
        if let Some(v) = pick("ODOO_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = pick("ODOO_PASSWORD") {
            self.password = Some(v);
        }
        self
    }
}

/// Validated settings for one sync run.
#[derive(Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub model: String,
    pub timeout_secs: u64,
    pub db_path: Option<PathBuf>,
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl SyncConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_file(ConfigFile::load()?)
    }

    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let missing: Vec<&'static str> = [
            ("url", present(&file.url)),
            ("database", present(&file.database)),
            ("username", present(&file.username)),
            ("password", present(&file.password)),
        ]
        .into_iter()
        .filter_map(|(key, ok)| (!ok).then_some(key))
        .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let url = normalize_url(file.url.as_deref().unwrap_or_default());
        Url::parse(&url).map_err(|source| ConfigError::InvalidUrl { url: url.clone(), source })?;

        Ok(Self {
            url,
            database: file.database.unwrap_or_default().trim().to_string(),
            username: file.username.unwrap_or_default().trim().to_string(),
            password: file.password.unwrap_or_default(),
            model: file.model.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: file.timeout_secs.filter(|t| *t > 0).unwrap_or(DEFAULT_TIMEOUT_SECS),
            db_path: file.db_path,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured store path, else the platform data directory.
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(default_db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ConfigFile {
        ConfigFile {
            url: Some("odoo.example.com/".to_string()),
            database: Some("prod".to_string()),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..ConfigFile::default()
        }
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let cfg = SyncConfig::from_file(complete()).unwrap();
        assert_eq!(cfg.url, "https://odoo.example.com");
        assert_eq!(cfg.model, "res.partner");
        assert_eq!(cfg.timeout(), Duration::from_secs(20));
    }

    #[test]
    fn missing_parameters_are_all_reported() {
        let file = ConfigFile { url: None, password: Some("  ".to_string()), ..complete() };
        match SyncConfig::from_file(file) {
            Err(ConfigError::Missing(keys)) => assert_eq!(keys, ["url", "password"]),
            other => panic!("expected missing keys, got {other:?}"),
        }
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = complete().with_overrides(|key| match key {
            "ODOO_DB" => Some("staging".to_string()),
            "ODOO_PASSWORD" => Some(String::new()),
            _ => None,
        });
        assert_eq!(file.database.as_deref(), Some("staging"));
        assert_eq!(file.password.as_deref(), Some("secret"));
    }

    #[test]
    fn reads_toml_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odoo-sync.toml");
        assert!(ConfigFile::read(&path).unwrap().url.is_none());

        fs::write(
            &path,
            r#"
url = "http://localhost:8069"
database = "odoo"
username = "bot"
password = "pw"
timeout_secs = 5
db_path = "/var/lib/odoo-sync/contacts.sqlite"
"#,
        )
        .unwrap();
        let cfg = SyncConfig::from_file(ConfigFile::read(&path).unwrap()).unwrap();
        assert_eq!(cfg.url, "http://localhost:8069");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.resolved_db_path(), Some(PathBuf::from("/var/lib/odoo-sync/contacts.sqlite")));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odoo-sync.toml");
        fs::write(&path, "url = [").unwrap();
        assert!(matches!(ConfigFile::read(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn debug_output_hides_password() {
        let cfg = SyncConfig::from_file(complete()).unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("secret"));
    }
}
