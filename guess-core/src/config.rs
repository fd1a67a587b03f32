use std::time::Duration;

use crate::retry::RetryPolicy;

/// One week, the lifetime of a game session
pub const DEFAULT_GUESS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// When the statistics cache is refreshed after a guess is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsRefresh {
    /// Spawned onto the runtime; `record_guess` returns without waiting
    #[default]
    Background,
    /// Awaited inside `record_guess`, failures are still only logged
    Inline,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub guess_ttl: Duration,
    pub retry: RetryPolicy,
    pub stats_refresh: StatsRefresh,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            guess_ttl: DEFAULT_GUESS_TTL,
            retry: RetryPolicy::default(),
            stats_refresh: StatsRefresh::default(),
        }
    }
}
