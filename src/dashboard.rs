//! Health dashboard: polling, snapshot bookkeeping and theme switching

use crate::client::HealthSource;
use crate::errors::{DashboardError, Result};
use crate::models::{HealthData, StatusConfig};
use crate::preferences::DarkModePreference;
use crate::render::{render_table, RenderedTable, Theme};

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, instrument, warn};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Lifecycle of the dashboard; `Polling` lasts until shutdown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingConfig,
    Polling,
}

struct DashboardState {
    phase: Phase,
    status_config: StatusConfig,
    snapshot: Option<HealthData>,
    /// Last applied fetch failed; the table shows the error row
    failed: bool,
    theme: Theme,
    /// Saved preference has been read into `theme`
    theme_loaded: bool,
    /// Sequence number of the newest fetch whose result was applied
    applied_seq: u64,
    table: RenderedTable,
}

#[derive(Debug, Default)]
struct PollCounters {
    fetches: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

/// Poll counters at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStats {
    pub fetches: u64,
    pub failures: u64,
    pub discarded: u64,
}

/// Renders `/api/health` into a table and keeps it current
#[derive(Clone)]
pub struct Dashboard {
    source: Arc<dyn HealthSource>,
    state: Arc<RwLock<DashboardState>>,
    preference: Arc<Mutex<DarkModePreference>>,
    next_seq: Arc<AtomicU64>,
    counters: Arc<PollCounters>,
    updates: Arc<watch::Sender<RenderedTable>>,
    poll_interval: Duration,
    clock: Clock,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn HealthSource>,
        preference: DarkModePreference,
        poll_interval: Duration,
    ) -> Self {
        let table = RenderedTable::default();
        let (updates, _) = watch::channel(table.clone());

        Self {
            source,
            state: Arc::new(RwLock::new(DashboardState {
                phase: Phase::AwaitingConfig,
                status_config: StatusConfig::new(),
                snapshot: None,
                failed: false,
                theme: table.theme,
                theme_loaded: false,
                applied_seq: 0,
                table,
            })),
            preference: Arc::new(Mutex::new(preference)),
            next_seq: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(PollCounters::default()),
            updates: Arc::new(updates),
            poll_interval,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used for staleness colors and cookie expiry
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Fetch the status styles, falling back to an empty map on any failure
    pub async fn fetch_status_config(&self) -> StatusConfig {
        match self.source.status_config().await {
            Ok(config) => {
                debug!("Loaded {} status styles", config.len());
                config
            }
            Err(e) => {
                warn!("Error fetching status config, using unknown styling: {}", e);
                StatusConfig::new()
            }
        }
    }

    /// Fetch health data and render it, or show the error row.
    ///
    /// Results of fetches that were overtaken by a newer one are dropped.
    pub async fn fetch_health_data(&self) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);

        let result = self.source.health().await;

        let mut state = self.state.write().await;
        if seq <= state.applied_seq {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Discarding health response {} (newer response {} already applied)",
                seq, state.applied_seq
            );
            return;
        }
        state.applied_seq = seq;

        match result {
            Ok(data) => {
                debug!(
                    "Fetched health data: {} categories, {} items",
                    data.categories.len(),
                    data.item_count()
                );
                state.snapshot = Some(data);
                state.failed = false;
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                error!("Error fetching health data: {}", e);
                state.failed = true;
            }
        }

        self.rerender(&mut state);
    }

    /// Render a snapshot, making it the last-known one.
    ///
    /// The snapshot counts as the newest response, so fetches still in
    /// flight are discarded when they complete.
    pub async fn render(&self, data: HealthData) -> RenderedTable {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut state = self.state.write().await;
        state.applied_seq = state.applied_seq.max(seq);
        state.snapshot = Some(data);
        state.failed = false;
        self.rerender(&mut state)
    }

    /// Flip the theme, persist it, and re-render the last-known snapshot
    pub async fn toggle_dark_mode(&self) -> Theme {
        let theme = {
            let mut state = self.state.write().await;
            self.load_theme(&mut state).await;
            state.theme = state.theme.toggled();
            self.rerender(&mut state);
            state.theme
        };

        let now = (self.clock)();
        if let Err(e) = self.preference.lock().await.store(theme.is_dark(), now).await {
            warn!("Failed to persist dark mode preference: {}", e);
        }

        info!("Dark mode {}", if theme.is_dark() { "enabled" } else { "disabled" });
        theme
    }

    /// Apply the saved theme, load the status config and perform the first
    /// health fetch
    pub async fn initialize(&self) {
        let config = self.fetch_status_config().await;
        {
            let mut state = self.state.write().await;
            if self.load_theme(&mut state).await {
                self.rerender(&mut state);
            }
            state.status_config = config;
            state.phase = Phase::Polling;
        }

        self.fetch_health_data().await;
    }

    /// Initialize, then fetch every poll interval until the task is dropped.
    ///
    /// Each tick runs in its own task so a slow board cannot delay the
    /// schedule.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        self.initialize().await;
        info!("Polling health data every {:?}", self.poll_interval);

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        loop {
            ticker.tick().await;
            let dashboard = self.clone();
            tokio::spawn(async move {
                dashboard.fetch_health_data().await;
            });
        }
    }

    /// Run until Ctrl-C, then log a summary
    pub async fn start(&self) -> Result<()> {
        let poller = self.clone();
        let handle = tokio::spawn(async move {
            poller.run().await;
        });

        tokio::signal::ctrl_c().await.map_err(|e| {
            DashboardError::Other(format!("Failed to wait for shutdown signal: {}", e))
        })?;

        handle.abort();

        let stats = self.stats();
        info!(
            "Dashboard stopped - {} fetches, {} failed, {} superseded",
            stats.fetches, stats.failures, stats.discarded
        );
        Ok(())
    }

    /// Receive every newly rendered table
    pub fn subscribe(&self) -> watch::Receiver<RenderedTable> {
        self.updates.subscribe()
    }

    pub async fn current_table(&self) -> RenderedTable {
        self.state.read().await.table.clone()
    }

    pub async fn snapshot(&self) -> Option<HealthData> {
        self.state.read().await.snapshot.clone()
    }

    pub async fn theme(&self) -> Theme {
        self.state.read().await.theme
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    pub fn stats(&self) -> PollStats {
        PollStats {
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }

    /// Read the saved theme once; returns whether it was read now
    async fn load_theme(&self, state: &mut DashboardState) -> bool {
        if state.theme_loaded {
            return false;
        }
        let now = (self.clock)();
        state.theme = Theme::from_dark(self.preference.lock().await.is_dark(now));
        state.theme_loaded = true;
        debug!("Saved theme: {:?}", state.theme);
        true
    }

    /// Rebuild the table from the state and publish it
    fn rerender(&self, state: &mut DashboardState) -> RenderedTable {
        let table = if state.failed {
            RenderedTable::error(state.theme)
        } else if let Some(data) = &state.snapshot {
            render_table(data, &state.status_config, state.theme, (self.clock)())
        } else {
            RenderedTable {
                rows: Vec::new(),
                theme: state.theme,
            }
        };

        state.table = table.clone();
        self.updates.send_replace(table.clone());
        table
    }
}
