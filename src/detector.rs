//! Change detection between the last snapshot and a fresh observation.
//!
//! Rules are evaluated in a fixed order: status, then version (only when the
//! status did not change), then gamemode, then players. A failed fetch is
//! never a change.

use std::collections::BTreeSet;

use crate::debounce::OfflineDebouncer;
use crate::fetch::FetchError;
use crate::roster;
use crate::snapshot::{
    OnlineStatus, RawObservation, ServerInfo, ServerKind, Snapshot, UNKNOWN_VERSION,
};

/// Players online out of the server's capacity, as of the latest observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Population {
    pub online: u32,
    pub max: u32,
}

/// Who joined or left: individual names when the server reports them,
/// otherwise only how many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerDelta {
    Names(Vec<String>),
    Count(u32),
}

/// One notable difference found in a poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    StatusChanged { online: bool, info: ServerInfo },
    VersionChanged { from: String, to: String },
    GamemodeChanged { to: String },
    PlayersJoined { players: PlayerDelta, population: Population },
    PlayersLeft { players: PlayerDelta, population: Population },
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub changes: Vec<Change>,
    pub next: Snapshot,
    pub should_persist: bool,
}

impl Detection {
    fn unchanged(previous: &Snapshot) -> Self {
        Self {
            changes: Vec::new(),
            next: previous.clone(),
            should_persist: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    kind: ServerKind,
    debouncer: OfflineDebouncer,
}

impl ChangeDetector {
    #[must_use]
    pub fn new(kind: ServerKind, debouncer: OfflineDebouncer) -> Self {
        Self { kind, debouncer }
    }

    #[must_use]
    pub fn detect(
        &self,
        previous: &Snapshot,
        observation: &Result<RawObservation, FetchError>,
    ) -> Detection {
        let Ok(raw) = observation else {
            return Detection::unchanged(previous);
        };

        let (effective, counter) = self.debouncer.update(
            raw.online,
            previous.online,
            previous.consecutive_offline_checks,
        );

        // Still inside the debounce window: the server looks down but is not
        // reported as such yet, so nothing from this observation is trusted,
        // including the player count (see DESIGN.md, debounce window).
        if !raw.online && effective.is_online() {
            let mut next = previous.clone();
            next.consecutive_offline_checks = counter;
            return Detection {
                changes: Vec::new(),
                should_persist: counter != previous.consecutive_offline_checks,
                next,
            };
        }

        let online = effective.is_online();
        // Without a baseline there is nothing to compare gamemode or players to.
        let has_baseline = previous.online != OnlineStatus::Unknown;
        let mut changes = Vec::new();

        if effective != previous.online {
            changes.push(Change::StatusChanged {
                online,
                info: raw.server_info(),
            });
        } else if online && raw.version != previous.version && raw.version != UNKNOWN_VERSION {
            changes.push(Change::VersionChanged {
                from: previous.version.clone(),
                to: raw.version.clone(),
            });
        }

        if online && has_baseline {
            if self.kind.supports_gamemode() && raw.gamemode != previous.gamemode {
                changes.push(Change::GamemodeChanged {
                    to: raw.gamemode.clone(),
                });
            }
            self.player_changes(previous, raw, &mut changes);
        }

        let next = self.next_snapshot(previous, raw, effective, counter);
        let should_persist =
            !changes.is_empty() || counter != previous.consecutive_offline_checks;

        Detection {
            changes,
            next,
            should_persist,
        }
    }

    fn player_changes(
        &self,
        previous: &Snapshot,
        raw: &RawObservation,
        changes: &mut Vec<Change>,
    ) {
        let population = Population {
            online: raw.player_count,
            max: raw.max_players,
        };

        let reported = raw
            .roster
            .as_ref()
            .filter(|_| self.kind.supports_roster())
            .filter(|current| !current.is_empty() || !previous.player_names.is_empty());

        if let Some(current) = reported {
            let diff = roster::diff(&previous.player_names, current);
            if !diff.joined.is_empty() {
                changes.push(Change::PlayersJoined {
                    players: PlayerDelta::Names(diff.joined),
                    population,
                });
            }
            if !diff.left.is_empty() {
                changes.push(Change::PlayersLeft {
                    players: PlayerDelta::Names(diff.left),
                    population,
                });
            }
            return;
        }

        if raw.player_count > previous.player_count {
            changes.push(Change::PlayersJoined {
                players: PlayerDelta::Count(raw.player_count - previous.player_count),
                population,
            });
        } else if raw.player_count < previous.player_count {
            changes.push(Change::PlayersLeft {
                players: PlayerDelta::Count(previous.player_count - raw.player_count),
                population,
            });
        }
    }

    fn next_snapshot(
        &self,
        previous: &Snapshot,
        raw: &RawObservation,
        effective: OnlineStatus,
        counter: u32,
    ) -> Snapshot {
        let mut next = Snapshot {
            online: effective,
            player_count: raw.player_count,
            max_players: raw.max_players,
            gamemode: previous.gamemode.clone(),
            version: previous.version.clone(),
            player_names: BTreeSet::new(),
            consecutive_offline_checks: counter,
        };

        if effective.is_online() {
            if raw.version != UNKNOWN_VERSION {
                next.version.clone_from(&raw.version);
            }
            next.gamemode = if self.kind.supports_gamemode() {
                raw.gamemode.clone()
            } else {
                String::new()
            };
            // A missing list keeps the last known names so they are not
            // announced as joining again once the list comes back.
            if self.kind.supports_roster() {
                next.player_names = raw
                    .roster
                    .clone()
                    .unwrap_or_else(|| previous.player_names.clone());
            }
        }

        next
    }
}
