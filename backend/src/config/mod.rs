//! Central module for application-wide configuration settings.
//!
//! Configuration is layered with figment:
//!
//! 1. Defaults (from `#[serde(default)]`)
//! 2. TOML config file, if it exists
//! 3. Environment variables with the `KAYEASE_` prefix, nested with `__`
//!    (`KAYEASE_OPERATOR__PASSWORD` → `operator.password`)
//!
//! The defaults reproduce the historical operator login, so a deployment
//! should at least override `operator.password`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Credentials, SessionSettings};
use crate::errors::AppError;

pub const ENV_PREFIX: &str = "KAYEASE_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// The single identity allowed into the admin area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_email() -> String {
    "contact@kayease.com".to_string()
}

fn default_password() -> String {
    "Kayease@123".to_string()
}

fn default_name() -> String {
    "Admin User".to_string()
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: default_password(),
            name: default_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Presence marker written next to the session.
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u32,
    #[serde(default = "default_refresh_after_minutes")]
    pub refresh_after_minutes: u32,
}

fn default_token() -> String {
    "Kayease-admin-token".to_string()
}

fn default_ttl_minutes() -> u32 {
    30
}

fn default_refresh_after_minutes() -> u32 {
    25
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
            ttl_minutes: default_ttl_minutes(),
            refresh_after_minutes: default_refresh_after_minutes(),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.ttl_minutes))
    }

    pub fn refresh_after(&self) -> Duration {
        Duration::minutes(i64::from(self.refresh_after_minutes))
    }
}

/// The REST backend the admin pages talk to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ApiConfig {
    /// Cookies are marked `Secure` when the site is served over https.
    pub fn is_https(&self) -> bool {
        self.base_url
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
    }
}

/// File names of the two session stores, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,
    #[serde(default = "default_local_file")]
    pub local_file: PathBuf,
}

fn default_cookie_file() -> PathBuf {
    PathBuf::from("cookies.txt")
}

fn default_local_file() -> PathBuf {
    PathBuf::from("local-storage.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cookie_file: default_cookie_file(),
            local_file: default_local_file(),
        }
    }
}

impl Config {
    /// Loads the TOML file (if present) and environment overrides.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml(toml: &str) -> Result<Self, AppError> {
        Self::extract(Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<Self, AppError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut problems = Vec::new();
        if self.operator.email.trim().is_empty() {
            problems.push("operator.email must not be empty".to_string());
        }
        if self.operator.password.is_empty() {
            problems.push("operator.password must not be empty".to_string());
        }
        if self.session.token.is_empty() {
            problems.push("session.token must not be empty".to_string());
        }
        // These end up inside cookie values, where ';' ends the value.
        for (field, value) in [
            ("operator.email", &self.operator.email),
            ("operator.name", &self.operator.name),
            ("session.token", &self.session.token),
        ] {
            if value.contains(';') {
                problems.push(format!("{field} must not contain ';'"));
            }
        }
        if self.session.refresh_after_minutes == 0 {
            problems.push("session.refresh_after_minutes must be positive".to_string());
        }
        if self.session.refresh_after_minutes >= self.session.ttl_minutes {
            problems.push("session.refresh_after_minutes must be below session.ttl_minutes".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidConfig(problems.join("; ")))
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            credentials: Credentials {
                email: self.operator.email.clone(),
                password: self.operator.password.clone(),
            },
            operator_name: self.operator.name.clone(),
            token: self.session.token.clone(),
            ttl: self.session.ttl(),
            refresh_after: self.session.refresh_after(),
        }
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kayease-admin")
            .join("config.toml")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kayease-admin")
    }
}
