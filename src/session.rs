use std::future::Future;
use std::sync::RwLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::aggregate::Aggregation;
use crate::analyzer::{Analyzer, DefaultAnalyzer};
use crate::classify::Classification;
use crate::config::NetStatsConfig;
use crate::error::NetStatsError;
use crate::fetch_gate::{self, LinkProbe};
use crate::models::{ClassifiedSlot, Recommendation, StoreStatus};
use crate::seed;
use crate::select;
use crate::store::SampleStore;

/// Lifecycle of the backing store: `Opening -> Ready`,
/// `Opening -> Seeding -> Ready`, or `Opening -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Closed,
    Opening,
    Seeding,
    Ready,
    Failed,
}

/// Result of the latest analysis run. Replaced wholesale on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSession {
    pub date: NaiveDate,
    pub delta_time_minutes: u32,
    pub wifi_slots: Vec<ClassifiedSlot>,
    pub mobile_slots: Vec<ClassifiedSlot>,
    /// Per-bucket `wifi_usable || mobile_usable` for the whole day.
    pub day_usability: Vec<bool>,
    pub corrupt_buckets: Vec<usize>,
    analyzed: bool,
}

impl AnalysisSession {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            delta_time_minutes: 0,
            wifi_slots: Vec::new(),
            mobile_slots: Vec::new(),
            day_usability: Vec::new(),
            corrupt_buckets: Vec::new(),
            analyzed: false,
        }
    }

    fn from_run(date: NaiveDate, aggregation: Aggregation, classification: Classification) -> Self {
        let mut session = Self::new(date);
        let bucket_count = aggregation.bucket_count;

        session.delta_time_minutes = if bucket_count > 0 {
            1440 / bucket_count as u32
        } else {
            0
        };
        session.day_usability = vec![false; bucket_count];
        for slot in &classification.all {
            if let Some(usable) = session.day_usability.get_mut(slot.summary.bucket) {
                *usable = slot.wifi_usable || slot.mobile_usable;
            }
        }
        session.wifi_slots = classification.wifi_slots;
        session.mobile_slots = classification.mobile_slots;
        session.corrupt_buckets = aggregation.corrupt_buckets;
        session.analyzed = true;
        session
    }
}

/// Planner service: owns the store, the analyzer, and the current session.
pub struct NetStats<S, A = DefaultAnalyzer> {
    store: S,
    analyzer: A,
    config: NetStatsConfig,
    state: RwLock<StoreState>,
    session: RwLock<AnalysisSession>,
    run_lock: tokio::sync::Mutex<()>,
}

impl<S: SampleStore> NetStats<S, DefaultAnalyzer> {
    pub fn new(store: S, config: NetStatsConfig) -> Self {
        let analyzer = DefaultAnalyzer::from_config(&config);
        Self::with_analyzer(store, analyzer, config)
    }
}

async fn guarded<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = anyhow::Result<T>>,
    wrap: fn(String) -> NetStatsError,
) -> Result<T, NetStatsError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NetStatsError::Cancelled),
        result = fut => result.map_err(|err| wrap(format!("{err:#}"))),
    }
}

fn open_failed(reason: String) -> NetStatsError {
    NetStatsError::StoreOpenFailed { reason }
}

fn query_failed(reason: String) -> NetStatsError {
    NetStatsError::StoreQueryFailed { reason }
}

impl<S: SampleStore, A: Analyzer> NetStats<S, A> {
    pub fn with_analyzer(store: S, analyzer: A, config: NetStatsConfig) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            store,
            analyzer,
            config,
            state: RwLock::new(StoreState::Closed),
            session: RwLock::new(AnalysisSession::new(today)),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> StoreState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, next: StoreState) {
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        if *state != next {
            info!(from = ?*state, to = ?next, "store state changed");
            *state = next;
        }
    }

    /// Copy of the current session.
    pub fn session(&self) -> AnalysisSession {
        self.session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn replace_session(&self, next: AnalysisSession) {
        *self.session.write().unwrap_or_else(|p| p.into_inner()) = next;
    }

    /// Opens the store, seeds it when empty, and runs the first analysis for `now`.
    pub async fn init(
        &self,
        now: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<(), NetStatsError> {
        self.replace_session(AnalysisSession::new(now.date()));

        if let Err(err) = self.open_store(now.date(), cancel).await {
            error!("failed to initialise sample store: {err}");
            self.set_state(StoreState::Failed);
            return Err(err);
        }

        self.set_state(StoreState::Ready);
        if let Err(err) = self.run_analysis(None, now, cancel).await {
            error!("initial analysis failed: {err}");
            self.set_state(StoreState::Failed);
            return Err(err);
        }
        Ok(())
    }

    async fn open_store(
        &self,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<(), NetStatsError> {
        self.set_state(StoreState::Opening);

        match guarded(cancel, self.store.open(), open_failed).await? {
            StoreStatus::Ready => Ok(()),
            StoreStatus::Empty => {
                self.set_state(StoreState::Seeding);
                let samples = seed::generate(&self.config.seed, self.config.bucket_minutes, today);
                info!(count = samples.len(), "seeding empty sample store");
                self.store.stage_samples(samples).await;
                let saved = guarded(cancel, self.store.save(), open_failed).await?;
                info!(saved, "sample store seeded");
                Ok(())
            }
            StoreStatus::Error => Err(NetStatsError::StoreOpenFailed {
                reason: "store reported an error status".to_string(),
            }),
        }
    }

    /// Rebuilds the session for `date` (default: the date of `now`).
    ///
    /// Runs are serialised; the new session only becomes visible once complete.
    pub async fn run_analysis(
        &self,
        date: Option<NaiveDate>,
        now: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<(), NetStatsError> {
        if self.state() != StoreState::Ready {
            return Err(NetStatsError::StoreUnavailable);
        }

        let _run = self.run_lock.lock().await;
        let date = date.unwrap_or(now.date());
        let buckets = guarded(
            cancel,
            self.store.records_for_weekday(date.weekday()),
            query_failed,
        )
        .await?;

        let aggregation = self.analyzer.aggregate(&buckets, date);
        if !aggregation.corrupt_buckets.is_empty() {
            warn!(
                %date,
                corrupt = aggregation.corrupt_buckets.len(),
                "store returned empty buckets"
            );
        }
        let classification = self.analyzer.classify(&aggregation.summaries, now);
        let session = AnalysisSession::from_run(date, aggregation, classification);

        info!(
            %date,
            wifi = session.wifi_slots.len(),
            mobile = session.mobile_slots.len(),
            delta_minutes = session.delta_time_minutes,
            "analysis complete"
        );
        self.replace_session(session);
        Ok(())
    }

    pub fn next_best_slot(&self, now: NaiveDateTime) -> Result<Recommendation, NetStatsError> {
        let session = self.session.read().unwrap_or_else(|p| p.into_inner());
        if !session.analyzed {
            return Err(NetStatsError::StoreUnavailable);
        }
        Ok(self
            .analyzer
            .select_next(&session.wifi_slots, &session.mobile_slots, now))
    }

    /// Start of the first usable bucket at or after `now` on the session date.
    pub fn next_coarse_window(&self, now: NaiveDateTime) -> Result<NaiveDateTime, NetStatsError> {
        let session = self.session.read().unwrap_or_else(|p| p.into_inner());
        if !session.analyzed {
            return Err(NetStatsError::StoreUnavailable);
        }
        select::select_by_coarse_window(
            &session.day_usability,
            session.date.and_time(now.time()),
            session.delta_time_minutes,
        )
    }

    pub fn is_fetchable_now(&self, probe: &impl LinkProbe) -> bool {
        fetch_gate::is_fetchable_now(&probe.current_link_info(), &self.config.fetch)
    }
}
