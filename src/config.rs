use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fs, time::Duration};
use url::Url;

use crate::error::Error;
use crate::snapshot::ServerKind;

pub const DEFAULT_API_BASE_URL: &str = "https://api.mcsrvstat.us";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub config: ConfigOptions,
    #[serde(default)]
    pub server: ServerOptions,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConfigOptions {
    pub timeout_secs: u64,
    pub check_interval_secs: u64,
    /// Consecutive offline checks before the server is reported offline.
    pub offline_threshold: u32,
    pub discord_id: Option<u64>,
    pub webhook_url: Option<String>,
    pub state_file: Option<PathBuf>,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            check_interval_secs: 300,
            offline_threshold: 1,
            discord_id: None,
            webhook_url: None,
            state_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    pub address: String,
    pub kind: ServerKind,
    pub api_base_url: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            address: String::new(),
            kind: ServerKind::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Loads the config file (if any) and applies environment overrides.
    ///
    /// The file is `$MCWATCH_CONFIG`, or `config.toml` under the user config
    /// directory. Variables from a `.env` file count as environment.
    pub fn load() -> Result<Config, Error> {
        let path = dotenvy::var("MCWATCH_CONFIG")
            .map_or_else(|_| default_config_path(), PathBuf::from);
        Self::load_from(path, |key| dotenvy::var(key).ok())
    }

    pub fn load_from<P, F>(path: P, env: F) -> Result<Config, Error>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, env: F) -> Result<(), Error> {
        if let Some(address) = env("MC_SERVER") {
            self.server.address = address;
        }
        if let Some(kind) = env("SERVER_TYPE") {
            self.server.kind = kind.parse()?;
        }
        if let Some(interval) = parse_env(&env, "CHECK_INTERVAL")? {
            self.config.check_interval_secs = interval;
        }
        if let Some(timeout) = parse_env(&env, "REQUEST_TIMEOUT")? {
            self.config.timeout_secs = timeout;
        }
        if let Some(threshold) = parse_env(&env, "OFFLINE_THRESHOLD")? {
            self.config.offline_threshold = threshold;
        }
        if let Some(id) = parse_env(&env, "DISCORD_ID")? {
            self.config.discord_id = Some(id);
        }
        if let Some(webhook_url) = env("DISCORD_WEBHOOK_URL").or_else(|| env("WEBHOOK_URL")) {
            self.config.webhook_url = Some(webhook_url);
        }
        if let Some(state_file) = env("DATA_FILE") {
            self.config.state_file = Some(PathBuf::from(state_file));
        }

        // An empty webhook means notifications are disabled
        if self.config.webhook_url.as_deref().is_some_and(str::is_empty) {
            self.config.webhook_url = None;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        if self.server.address.trim().is_empty() {
            return Err(Error::Config(
                "server address is not set, use MC_SERVER (e.g. play.example.com:19132) \
                 or [server] address in the config file"
                    .to_string(),
            ));
        }
        self.api_base_url()?;
        if let Some(webhook_url) = &self.config.webhook_url {
            Url::parse(webhook_url)?;
        }
        Ok(())
    }

    pub fn api_base_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.server.api_base_url)?)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.config.check_interval_secs)
    }

    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.config
            .state_file
            .clone()
            .unwrap_or_else(default_state_path)
    }
}

fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} is not a valid number: {value:?}")))
        })
        .transpose()
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mcwatch")
        .join("config.toml")
}

fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mcwatch")
        .join("server_data.json")
}
