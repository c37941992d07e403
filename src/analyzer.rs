use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::aggregate::{self, Aggregation};
use crate::classify::{self, Classification};
use crate::config::{NetStatsConfig, SlotThresholds};
use crate::models::{ClassifiedSlot, RawSample, Recommendation, SlotSummary};
use crate::select;

/// The three analysis stages. Swap in another implementation to change how
/// slots are summarised, labelled, or picked.
pub trait Analyzer {
    fn aggregate(&self, buckets: &[Vec<RawSample>], date: NaiveDate) -> Aggregation;

    fn classify(&self, summaries: &[SlotSummary], now: NaiveDateTime) -> Classification;

    fn select_next(
        &self,
        wifi_slots: &[ClassifiedSlot],
        mobile_slots: &[ClassifiedSlot],
        now: NaiveDateTime,
    ) -> Recommendation;
}

#[derive(Debug, Clone)]
pub struct DefaultAnalyzer {
    pub thresholds: SlotThresholds,
    pub lookahead: Duration,
}

impl DefaultAnalyzer {
    pub fn from_config(config: &NetStatsConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            lookahead: Duration::minutes(config.lookahead_minutes),
        }
    }
}

impl Analyzer for DefaultAnalyzer {
    fn aggregate(&self, buckets: &[Vec<RawSample>], date: NaiveDate) -> Aggregation {
        aggregate::aggregate(buckets, date)
    }

    fn classify(&self, summaries: &[SlotSummary], now: NaiveDateTime) -> Classification {
        classify::classify(summaries, &self.thresholds, now)
    }

    fn select_next(
        &self,
        wifi_slots: &[ClassifiedSlot],
        mobile_slots: &[ClassifiedSlot],
        now: NaiveDateTime,
    ) -> Recommendation {
        select::select_next(wifi_slots, mobile_slots, now, self.lookahead)
    }
}
