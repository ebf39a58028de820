// Suite settings: built-in defaults, then an optional booking-flow.toml, then BOOKER_* environment variables
use crate::client::{ClientConfig, DEFAULT_BASE_URL};
use crate::fixtures::{DEFAULT_PASSWORD, DEFAULT_USERNAME};
use crate::model::Credentials;
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "booking-flow.toml";
pub const ENV_PREFIX: &str = "BOOKER";

#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_ms: u64,
}

impl SuiteConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("username", DEFAULT_USERNAME)?
            .set_default("password", DEFAULT_PASSWORD)?
            .set_default("timeout_ms", 30_000i64)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}
