use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Result;

#[derive(Clone, Debug, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub aws: AwsConfig,
}

/// Listener settings, read from `HOST` and `PORT`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// `APP_*` variables.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_env")]
    pub env: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug: bool,
    /// Memory budget for the process, e.g. `512M` or `2G`. Unset, `0` or `-1`
    /// means the host's total memory.
    pub memory_limit: Option<String>,
}

/// `DB_*` variables. Nothing connects with these yet.
#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub name: String,
    pub username: Option<String>,
    // Left out of `Config::get` as well as `Debug`; read the field directly
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// `AWS_*` variables plus the Secrets Manager secret name.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AwsConfig {
    #[serde(default = "default_aws_region")]
    pub region: String,

    // Read from SECRETS_MANAGER_SECRET_NAME, outside the AWS_ prefix
    #[serde(skip_deserializing)]
    pub secrets_manager_secret: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_app_name() -> String {
    "AWS Data Platform".to_string()
}

fn default_app_env() -> String {
    "production".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_name() -> String {
    "data_platform".to_string()
}

fn default_aws_region() -> String {
    "us-east-1".to_string()
}

const SECRET_NAME_VAR: &str = "SECRETS_MANAGER_SECRET_NAME";

/// Accepts `1`, `true`, `on` and `yes` (any case) as true; anything else is false.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_flag(&raw))
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

fn parse_byte_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (number, multiplier) = match raw.char_indices().last()? {
        (at, 'g' | 'G') => (&raw[..at], 1024 * 1024 * 1024),
        (at, 'm' | 'M') => (&raw[..at], 1024 * 1024),
        (at, 'k' | 'K') => (&raw[..at], 1024),
        _ => (raw, 1),
    };
    number
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .and_then(|value| value.checked_mul(multiplier))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build the configuration from an explicit set of variables.
    ///
    /// Empty values count as unset and fall back to the default.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let server: ServerConfig = envy::from_iter(vars.clone())?;
        let app: AppConfig = envy::prefixed("APP_").from_iter(vars.clone())?;
        let database: DatabaseConfig = envy::prefixed("DB_").from_iter(vars.clone())?;
        let mut aws: AwsConfig = envy::prefixed("AWS_").from_iter(vars.clone())?;
        aws.secrets_manager_secret = vars
            .into_iter()
            .find(|(key, _)| key == SECRET_NAME_VAR)
            .map(|(_, value)| value);

        Ok(Config {
            server,
            app,
            database,
            aws,
        })
    }

    /// Look up a value by dotted key, e.g. `database.port`.
    ///
    /// `None` as the key returns the whole tree. Missing and unset keys both
    /// return `None`. `database.password` is never part of the tree.
    pub fn get(&self, key: Option<&str>) -> Option<Value> {
        let tree = serde_json::to_value(self).ok()?;
        let Some(key) = key else {
            return Some(tree);
        };

        key.split('.')
            .try_fold(tree, |node, segment| node.get(segment).cloned())
            .filter(|value| !value.is_null())
    }

    /// `APP_MEMORY_LIMIT` in bytes. Accepts a plain byte count or a `K`/`M`/`G`
    /// suffix (binary multiples, any case).
    pub fn memory_limit_bytes(&self) -> Option<u64> {
        self.app.memory_limit.as_deref().and_then(parse_byte_size)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
