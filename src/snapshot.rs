use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Version string reported when the status API does not know the version.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// The two server editions the status API can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ServerKind {
    #[default]
    Bedrock,
    Java,
}

impl ServerKind {
    /// Only Bedrock servers report a gamemode.
    #[must_use]
    pub fn supports_gamemode(self) -> bool {
        matches!(self, ServerKind::Bedrock)
    }

    /// Only Java servers report individual player names.
    #[must_use]
    pub fn supports_roster(self) -> bool {
        matches!(self, ServerKind::Java)
    }

    /// Path prefix of the status endpoint for this kind.
    #[must_use]
    pub fn api_prefix(self) -> &'static str {
        match self {
            ServerKind::Bedrock => "bedrock/3",
            ServerKind::Java => "3",
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerKind::Bedrock => f.write_str("BEDROCK"),
            ServerKind::Java => f.write_str("JAVA"),
        }
    }
}

impl FromStr for ServerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEDROCK" => Ok(ServerKind::Bedrock),
            "JAVA" => Ok(ServerKind::Java),
            other => Err(Error::Config(format!(
                "server kind must be either BEDROCK or JAVA, got {other:?}"
            ))),
        }
    }
}

impl TryFrom<String> for ServerKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Effective online state. `Unknown` only exists before the first observation.
///
/// Persisted as `true`/`false`/`null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum OnlineStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl OnlineStatus {
    #[must_use]
    pub fn is_online(self) -> bool {
        self == OnlineStatus::Online
    }
}

impl From<bool> for OnlineStatus {
    fn from(online: bool) -> Self {
        if online {
            OnlineStatus::Online
        } else {
            OnlineStatus::Offline
        }
    }
}

impl From<Option<bool>> for OnlineStatus {
    fn from(value: Option<bool>) -> Self {
        value.map_or(OnlineStatus::Unknown, OnlineStatus::from)
    }
}

impl From<OnlineStatus> for Option<bool> {
    fn from(status: OnlineStatus) -> Self {
        match status {
            OnlineStatus::Unknown => None,
            OnlineStatus::Online => Some(true),
            OnlineStatus::Offline => Some(false),
        }
    }
}

/// Last known server state, used as the baseline for the next comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(rename = "server_status")]
    pub online: OnlineStatus,
    #[serde(rename = "online_count")]
    pub player_count: u32,
    #[serde(skip)]
    pub max_players: u32,
    pub gamemode: String,
    pub version: String,
    /// Kept ordered so the stored list is sorted and diffable.
    pub player_names: BTreeSet<String>,
    pub consecutive_offline_checks: u32,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            online: OnlineStatus::Unknown,
            player_count: 0,
            max_players: 0,
            gamemode: String::new(),
            version: UNKNOWN_VERSION.to_string(),
            player_names: BTreeSet::new(),
            consecutive_offline_checks: 0,
        }
    }
}

/// Extra details shown when the server comes online.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub version: String,
    pub software: Option<String>,
    pub plugin_count: usize,
    pub mod_count: usize,
    pub motd: Option<String>,
}

/// One parsed response from the status API. Defaults are already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    pub online: bool,
    pub player_count: u32,
    pub max_players: u32,
    pub version: String,
    pub gamemode: String,
    pub software: Option<String>,
    pub motd: Option<String>,
    pub plugin_count: usize,
    pub mod_count: usize,
    /// `None` when the API did not include a player list.
    pub roster: Option<BTreeSet<String>>,
}

impl Default for RawObservation {
    fn default() -> Self {
        Self {
            online: false,
            player_count: 0,
            max_players: 0,
            version: UNKNOWN_VERSION.to_string(),
            gamemode: String::new(),
            software: None,
            motd: None,
            plugin_count: 0,
            mod_count: 0,
            roster: None,
        }
    }
}

impl RawObservation {
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            version: self.version.clone(),
            software: self.software.clone(),
            plugin_count: self.plugin_count,
            mod_count: self.mod_count,
            motd: self.motd.clone(),
        }
    }
}
