use crate::detector::{Change, PlayerDelta, Population};
use crate::snapshot::{ServerInfo, UNKNOWN_VERSION};

/// Renders changes into notification messages, in order.
///
/// Joins and leaves are batched with a single population line into one
/// message. Messages never carry timestamps.
#[must_use]
pub fn compose(changes: &[Change]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut roster: Option<(Vec<String>, Population)> = None;

    for change in changes {
        let message = match change {
            Change::PlayersJoined {
                players,
                population,
            } => {
                add_player_lines(&mut roster, joined_lines(players), *population);
                continue;
            }
            Change::PlayersLeft {
                players,
                population,
            } => {
                add_player_lines(&mut roster, left_lines(players), *population);
                continue;
            }
            Change::StatusChanged { online: true, info } => online_message(info),
            Change::StatusChanged { online: false, .. } => {
                "❌ The server is now OFFLINE.".to_string()
            }
            Change::VersionChanged { from, to } => {
                format!("🔄 Server version changed: {from} → {to}")
            }
            Change::GamemodeChanged { to } => format!("ℹ️ Gamemode changed to: {to}"),
        };

        if let Some(batch) = roster.take() {
            messages.push(roster_message(batch));
        }
        messages.push(message);
    }

    if let Some(batch) = roster.take() {
        messages.push(roster_message(batch));
    }

    messages
}

fn add_player_lines(
    roster: &mut Option<(Vec<String>, Population)>,
    new_lines: Vec<String>,
    population: Population,
) {
    let (lines, batch_population) = roster.get_or_insert_with(|| (Vec::new(), population));
    lines.extend(new_lines);
    *batch_population = population;
}

fn joined_lines(players: &PlayerDelta) -> Vec<String> {
    match players {
        PlayerDelta::Names(names) => names
            .iter()
            .map(|name| format!("🎮 {name} joined!"))
            .collect(),
        PlayerDelta::Count(1) => vec!["🎮 A player joined!".to_string()],
        PlayerDelta::Count(n) => vec![format!("🎮 {n} players joined!")],
    }
}

fn left_lines(players: &PlayerDelta) -> Vec<String> {
    match players {
        PlayerDelta::Names(names) => names
            .iter()
            .map(|name| format!("👋 {name} left."))
            .collect(),
        PlayerDelta::Count(1) => vec!["👋 A player left.".to_string()],
        PlayerDelta::Count(n) => vec![format!("👋 {n} players left.")],
    }
}

fn roster_message((mut lines, population): (Vec<String>, Population)) -> String {
    lines.push(population_line(population));
    lines.join("\n")
}

fn online_message(info: &ServerInfo) -> String {
    let version = if info.version.is_empty() || info.version == UNKNOWN_VERSION {
        String::new()
    } else {
        format!(" ({})", info.version)
    };
    let mut lines = vec![format!("✅ The server is now ONLINE!{version}")];

    let mut extra = Vec::new();
    if let Some(software) = info.software.as_deref().filter(|s| !s.is_empty()) {
        extra.push(software.to_string());
    }
    if info.plugin_count > 0 {
        extra.push(pluralize(info.plugin_count, "plugin"));
    }
    if info.mod_count > 0 {
        extra.push(pluralize(info.mod_count, "mod"));
    }
    if !extra.is_empty() {
        lines.push(extra.join(" | "));
    }

    if let Some(motd) = info.motd.as_deref().filter(|m| !m.is_empty()) {
        lines.push(format!("📝 {motd}"));
    }

    lines.join("\n")
}

fn population_line(population: Population) -> String {
    format!("📊 {}/{} players online", population.online, population.max)
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
