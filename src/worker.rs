use log::{error, info, warn};
use std::time::Duration;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::compose::compose;
use crate::config::Config;
use crate::debounce::OfflineDebouncer;
use crate::detector::ChangeDetector;
use crate::error::Error;
use crate::fetch::{McsrvstatFetcher, StatusFetcher};
use crate::notify::{DiscordNotifier, Notifier};
use crate::snapshot::{ServerKind, Snapshot};
use crate::store::{JsonStateStore, StateStore};

/// Continuously monitors the configured server and reports changes.
///
/// # Behavior
///
/// - Restores the last snapshot from the state file
/// - Fetches the server status every check interval
/// - Sends a Discord notification for each detected change (if configured)
/// - Persists the snapshot whenever something worth remembering changed
/// - Stops between cycles once `token` is cancelled
///
/// # Errors
///
/// Returns an error if an HTTP client or the API URL cannot be set up.
pub async fn monitor_server(config: &Config, token: CancellationToken) -> Result<(), Error> {
    // Initial configuration logging
    info!(
        "Starting Minecraft {} server monitor for {}",
        config.server.kind, config.server.address
    );
    info!(
        "Check interval: {} seconds",
        config.config.check_interval_secs
    );
    info!("Timeout: {} seconds", config.config.timeout_secs);
    info!(
        "Offline threshold: {} consecutive checks",
        config.config.offline_threshold
    );
    match (
        config.config.webhook_url.is_some(),
        config.config.discord_id.is_some(),
    ) {
        (true, true) => {
            info!("Webhook is set, a notification will be sent on every change");
            info!("Discord ID is set, notifications will be tagged for the user");
        }
        (true, false) => {
            info!("Webhook is set, a notification will be sent on every change");
            warn!("Discord ID is not set, notifications will not tag any user");
        }
        (false, _) => warn!("Webhook is not set, no notifications will be sent"),
    }

    let fetcher = McsrvstatFetcher::new(config.api_base_url()?, config.timeout())?;
    let notifier = DiscordNotifier::new(
        config.config.webhook_url.clone(),
        config.config.discord_id,
        config.timeout(),
    )?;
    let store = JsonStateStore::new(config.state_file(), config.server.kind);
    info!("State file: {}", store.path().display());

    let mut monitor = Monitor::new(config, fetcher, notifier, store);
    monitor.run(config.check_interval(), token).await;

    // Cleanup and shutdown
    info!("Server monitoring stopped gracefully");
    Ok(())
}

/// One server's poll cycle: fetch, detect, notify, persist.
pub struct Monitor<F, N, S> {
    address: String,
    kind: ServerKind,
    detector: ChangeDetector,
    fetcher: F,
    notifier: N,
    store: S,
    snapshot: Snapshot,
}

impl<F, N, S> Monitor<F, N, S>
where
    F: StatusFetcher,
    N: Notifier,
    S: StateStore,
{
    pub fn new(config: &Config, fetcher: F, notifier: N, store: S) -> Self {
        let snapshot = store.load();
        let detector = ChangeDetector::new(
            config.server.kind,
            OfflineDebouncer::new(config.config.offline_threshold),
        );
        Self {
            address: config.server.address.clone(),
            kind: config.server.kind,
            detector,
            fetcher,
            notifier,
            store,
            snapshot,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Runs one cycle and returns how many notifications were composed.
    pub async fn run_cycle(&mut self) -> usize {
        let observation = self.fetcher.fetch(&self.address, self.kind).await;
        if let Err(e) = &observation {
            warn!("{e}, keeping previous state");
        }

        let detection = self.detector.detect(&self.snapshot, &observation);
        let messages = compose(&detection.changes);

        for message in &messages {
            info!("{message}");
            if let Err(e) = self.notifier.send(message).await {
                error!("Failed to send notification: {e}");
            }
        }

        if detection.should_persist
            && let Err(e) = self.store.save(&detection.next)
        {
            error!("Failed to save server state: {e}");
        }

        self.snapshot = detection.next;
        messages.len()
    }

    pub async fn run(&mut self, interval: Duration, token: CancellationToken) {
        loop {
            // Check if we should shutdown before starting new cycle
            if token.is_cancelled() {
                info!("Shutdown requested, stopping monitor");
                break;
            }

            self.run_cycle().await;

            // Interruptible sleep
            select! {
                () = sleep(interval) => {},
                () = token.cancelled() => {
                    info!("Shutdown requested during sleep");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::snapshot::{OnlineStatus, RawObservation};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<RawObservation, FetchError>>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<RawObservation, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl StatusFetcher for ScriptedFetcher {
        async fn fetch(&self, _: &str, _: ServerKind) -> Result<RawObservation, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Timeout))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) -> Result<(), Error> {
            self.sent.lock().unwrap().push(message.to_string());
            if self.fail {
                Err(Error::Config("webhook rejected the message".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        stored: Arc<Mutex<Option<Snapshot>>>,
        saves: Arc<Mutex<usize>>,
        fail: bool,
    }

    impl StateStore for MemoryStore {
        fn load(&self) -> Snapshot {
            self.stored.lock().unwrap().clone().unwrap_or_default()
        }

        fn save(&self, snapshot: &Snapshot) -> Result<(), Error> {
            *self.saves.lock().unwrap() += 1;
            if self.fail {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            *self.stored.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    fn config(kind: ServerKind, threshold: u32) -> Config {
        let mut config = Config::default();
        config.server.address = "play.example.com".to_string();
        config.server.kind = kind;
        config.config.offline_threshold = threshold;
        config
    }

    fn online(count: u32) -> RawObservation {
        RawObservation {
            online: true,
            player_count: count,
            max_players: 10,
            version: "1.21.2".to_string(),
            gamemode: "Survival".to_string(),
            ..RawObservation::default()
        }
    }

    #[tokio::test]
    async fn test_cycles_notify_and_persist() {
        let fetcher = ScriptedFetcher::new(vec![Ok(online(0)), Ok(online(2)), Ok(online(2))]);
        let notifier = RecordingNotifier::default();
        let store = MemoryStore::default();
        let mut monitor = Monitor::new(
            &config(ServerKind::Bedrock, 1),
            fetcher,
            notifier.clone(),
            store.clone(),
        );

        assert_eq!(monitor.run_cycle().await, 1);
        assert_eq!(monitor.run_cycle().await, 1);
        assert_eq!(monitor.run_cycle().await, 0);

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                "✅ The server is now ONLINE! (1.21.2)",
                "🎮 2 players joined!\n📊 2/10 players online",
            ]
        );
        assert_eq!(*store.saves.lock().unwrap(), 2);
        let stored = store.stored.lock().unwrap().clone().unwrap();
        assert_eq!(stored.online, OnlineStatus::Online);
        assert_eq!(stored.player_count, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_silent() {
        let store = MemoryStore::default();
        *store.stored.lock().unwrap() = Some(Snapshot {
            online: OnlineStatus::Online,
            player_count: 5,
            ..Snapshot::default()
        });
        let notifier = RecordingNotifier::default();
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::Connection("network unreachable".to_string())),
            Err(FetchError::Http(500)),
            Err(FetchError::InvalidPayload("expected value".to_string())),
        ]);
        let mut monitor = Monitor::new(
            &config(ServerKind::Bedrock, 1),
            fetcher,
            notifier.clone(),
            store.clone(),
        );
        let before = monitor.snapshot().clone();

        for _ in 0..4 {
            assert_eq!(monitor.run_cycle().await, 0);
        }
        assert_eq!(monitor.snapshot(), &before);
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(*store.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_counter_survives_restart() {
        let store = MemoryStore::default();
        *store.stored.lock().unwrap() = Some(Snapshot {
            online: OnlineStatus::Online,
            ..Snapshot::default()
        });
        let notifier = RecordingNotifier::default();

        let mut monitor = Monitor::new(
            &config(ServerKind::Java, 2),
            ScriptedFetcher::new(vec![Ok(RawObservation::default())]),
            notifier.clone(),
            store.clone(),
        );
        assert_eq!(monitor.run_cycle().await, 0);
        assert_eq!(*store.saves.lock().unwrap(), 1);

        // A fresh process picks up the counter and completes the debounce.
        let mut monitor = Monitor::new(
            &config(ServerKind::Java, 2),
            ScriptedFetcher::new(vec![Ok(RawObservation::default())]),
            notifier.clone(),
            store.clone(),
        );
        assert_eq!(monitor.snapshot().consecutive_offline_checks, 1);
        assert_eq!(monitor.run_cycle().await, 1);
        assert_eq!(
            notifier.sent.lock().unwrap().clone(),
            vec!["❌ The server is now OFFLINE."]
        );
    }

    #[tokio::test]
    async fn test_delivery_and_save_failures_are_not_fatal() {
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };
        let store = MemoryStore {
            fail: true,
            ..MemoryStore::default()
        };
        let mut java = online(1);
        java.gamemode = String::new();
        java.roster = Some(["alice".to_string()].into());
        let mut later = online(0);
        later.gamemode = String::new();
        later.roster = Some(Default::default());

        let mut monitor = Monitor::new(
            &config(ServerKind::Java, 1),
            ScriptedFetcher::new(vec![Ok(java), Ok(later)]),
            notifier.clone(),
            store.clone(),
        );

        assert_eq!(monitor.run_cycle().await, 1);
        assert_eq!(monitor.run_cycle().await, 1);
        assert_eq!(monitor.snapshot().online, OnlineStatus::Online);
        assert!(monitor.snapshot().player_names.is_empty());
        assert_eq!(
            notifier.sent.lock().unwrap().last().cloned(),
            Some("👋 alice left.\n📊 0/10 players online".to_string())
        );
        assert_eq!(*store.saves.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let token = CancellationToken::new();
        let mut monitor = Monitor::new(
            &config(ServerKind::Bedrock, 1),
            ScriptedFetcher::new(vec![Ok(online(0))]),
            RecordingNotifier::default(),
            MemoryStore::default(),
        );

        let cancel = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        tokio::time::timeout(
            Duration::from_secs(5),
            monitor.run(Duration::from_secs(3600), token),
        )
        .await
        .expect("monitor did not stop after cancellation");
        assert_eq!(monitor.snapshot().online, OnlineStatus::Online);
    }
}
