use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::error::Error;
use crate::snapshot::{RawObservation, ServerKind, UNKNOWN_VERSION};

const USER_AGENT: &str = concat!("mcwatch/", env!("CARGO_PKG_VERSION"), " (server status monitor)");

/// Why a status fetch produced no observation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("API unreachable (connection error): {0}")]
    Connection(String),
    #[error("API unreachable (timeout)")]
    Timeout,
    #[error("API error (HTTP {0})")]
    Http(u16),
    #[error("API returned an invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Http(status.as_u16())
        } else if err.is_decode() {
            FetchError::InvalidPayload(err.to_string())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

/// Source of raw server observations.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(&self, address: &str, kind: ServerKind) -> Result<RawObservation, FetchError>;
}

/// Fetches status from an mcsrvstat.us compatible API.
pub struct McsrvstatFetcher {
    client: Client,
    base_url: Url,
}

impl McsrvstatFetcher {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn status_url(&self, address: &str, kind: ServerKind) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            kind.api_prefix(),
            address
        )
    }
}

#[async_trait]
impl StatusFetcher for McsrvstatFetcher {
    async fn fetch(&self, address: &str, kind: ServerKind) -> Result<RawObservation, FetchError> {
        let url = self.status_url(address, kind);
        debug!("Fetching {url}");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_observation(&body, kind)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusPayload {
    online: bool,
    players: Option<PlayersPayload>,
    version: Option<String>,
    gamemode: Option<String>,
    software: Option<String>,
    motd: Option<MotdPayload>,
    plugins: Option<Vec<IgnoredAny>>,
    mods: Option<Vec<IgnoredAny>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayersPayload {
    online: u32,
    max: u32,
    list: Option<Vec<PlayerEntry>>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MotdPayload {
    clean: Vec<String>,
}

/// Parses an API response body, applying defaults for absent fields.
///
/// Fields the server kind cannot report are dropped here, so a Java
/// observation never has a gamemode and a Bedrock one never has a roster.
pub fn parse_observation(body: &str, kind: ServerKind) -> Result<RawObservation, FetchError> {
    let payload: StatusPayload =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidPayload(e.to_string()))?;
    let players = payload.players.unwrap_or_default();

    let mut observation = RawObservation {
        online: payload.online,
        player_count: players.online,
        max_players: players.max,
        version: payload
            .version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        ..RawObservation::default()
    };

    if kind.supports_gamemode() {
        observation.gamemode = payload.gamemode.unwrap_or_default().trim().to_string();
    }

    if kind.supports_roster() {
        observation.software = payload.software.filter(|s| !s.is_empty());
        observation.motd = payload
            .motd
            .and_then(|motd| motd.clean.into_iter().next())
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty());
        observation.plugin_count = payload.plugins.map_or(0, |p| p.len());
        observation.mod_count = payload.mods.map_or(0, |m| m.len());
        observation.roster = players
            .list
            .map(|list| list.into_iter().map(|player| player.name).collect());
    }

    Ok(observation)
}
