use crate::snapshot::OnlineStatus;

/// Decides the effective online state from consecutive offline-looking checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineDebouncer {
    threshold: u32,
}

impl Default for OfflineDebouncer {
    fn default() -> Self {
        Self { threshold: 1 }
    }
}

impl OfflineDebouncer {
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Returns the effective status and the next offline counter.
    ///
    /// An online observation is authoritative and clears the counter. An
    /// offline observation only flips the status once the counter reaches the
    /// threshold; until then the previous status is kept. With no previous
    /// status there is nothing to hold on to, so the first observation wins.
    #[must_use]
    pub fn update(
        &self,
        raw_online: bool,
        previous: OnlineStatus,
        counter: u32,
    ) -> (OnlineStatus, u32) {
        if raw_online {
            return (OnlineStatus::Online, 0);
        }

        let next = counter.saturating_add(1);
        if next >= self.threshold || previous == OnlineStatus::Unknown {
            (OnlineStatus::Offline, next)
        } else {
            (previous, next)
        }
    }
}
