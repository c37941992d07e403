use std::collections::HashSet;

use chrono::{Datelike, Timelike, Weekday};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::db::PgSampleStore;
use crate::models::{RawSample, StoreStatus, WeekdayBuckets};

/// Historical sample repository the planner reads from.
///
/// Writes are two-phase: samples are staged, then persisted by `save`.
#[allow(async_fn_in_trait)]
pub trait SampleStore {
    async fn open(&self) -> anyhow::Result<StoreStatus>;

    async fn records_for_weekday(&self, weekday: Weekday) -> anyhow::Result<WeekdayBuckets>;

    async fn stage_samples(&self, samples: Vec<RawSample>);

    /// Persists staged samples and returns how many were new.
    async fn save(&self) -> anyhow::Result<usize>;
}

pub fn minute_of_day(sample: &RawSample) -> u32 {
    sample.start.hour() * 60 + sample.start.minute()
}

/// Lays samples out as a full day of `1440 / bucket_minutes` buckets keyed on
/// each sample's start time. Buckets nobody recorded stay empty.
pub fn bucket_samples(
    samples: impl IntoIterator<Item = RawSample>,
    bucket_minutes: u32,
) -> WeekdayBuckets {
    let bucket_minutes = bucket_minutes.max(1);
    let count = (1440 / bucket_minutes) as usize;
    let mut buckets: WeekdayBuckets = vec![Vec::new(); count];

    for sample in samples {
        let index = (minute_of_day(&sample) / bucket_minutes) as usize;
        match buckets.get_mut(index) {
            Some(bucket) => bucket.push(sample),
            None => warn!(index, "sample falls outside the day's buckets"),
        }
    }

    for bucket in buckets.iter_mut() {
        bucket.sort_by_key(|sample| sample.start);
    }
    buckets
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    bucket_minutes: u32,
    committed: RwLock<Vec<RawSample>>,
    staged: Mutex<Vec<RawSample>>,
}

impl MemoryStore {
    pub fn new(bucket_minutes: u32) -> Self {
        Self {
            bucket_minutes,
            ..Self::default()
        }
    }
}

impl SampleStore for MemoryStore {
    async fn open(&self) -> anyhow::Result<StoreStatus> {
        if self.committed.read().await.is_empty() {
            Ok(StoreStatus::Empty)
        } else {
            Ok(StoreStatus::Ready)
        }
    }

    async fn records_for_weekday(&self, weekday: Weekday) -> anyhow::Result<WeekdayBuckets> {
        let committed = self.committed.read().await;
        let samples = committed
            .iter()
            .filter(|sample| sample.start.weekday() == weekday)
            .cloned();
        Ok(bucket_samples(samples, self.bucket_minutes))
    }

    async fn stage_samples(&self, samples: Vec<RawSample>) {
        self.staged.lock().await.extend(samples);
    }

    async fn save(&self) -> anyhow::Result<usize> {
        let staged = std::mem::take(&mut *self.staged.lock().await);
        let mut committed = self.committed.write().await;
        let mut seen: HashSet<_> = committed.iter().map(|sample| sample.start).collect();

        let mut inserted = 0usize;
        for sample in staged {
            if seen.insert(sample.start) {
                committed.push(sample);
                inserted += 1;
            }
        }
        committed.sort_by_key(|sample| sample.start);
        debug!(inserted, total = committed.len(), "memory store saved");
        Ok(inserted)
    }
}

/// The store selected on the command line.
pub enum Backend {
    Postgres(PgSampleStore),
    Memory(MemoryStore),
}

impl SampleStore for Backend {
    async fn open(&self) -> anyhow::Result<StoreStatus> {
        match self {
            Backend::Postgres(store) => store.open().await,
            Backend::Memory(store) => store.open().await,
        }
    }

    async fn records_for_weekday(&self, weekday: Weekday) -> anyhow::Result<WeekdayBuckets> {
        match self {
            Backend::Postgres(store) => store.records_for_weekday(weekday).await,
            Backend::Memory(store) => store.records_for_weekday(weekday).await,
        }
    }

    async fn stage_samples(&self, samples: Vec<RawSample>) {
        match self {
            Backend::Postgres(store) => store.stage_samples(samples).await,
            Backend::Memory(store) => store.stage_samples(samples).await,
        }
    }

    async fn save(&self) -> anyhow::Result<usize> {
        match self {
            Backend::Postgres(store) => store.save().await,
            Backend::Memory(store) => store.save().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::sample_at;
    use chrono::NaiveDate;

    fn monday(hour: u32, minute: u32, weeks_back: i64) -> RawSample {
        let date =
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap() - chrono::Duration::weeks(weeks_back);
        sample_at(date.and_hms_opt(hour, minute, 0).unwrap(), 15)
    }

    #[test]
    fn buckets_cover_the_whole_day() {
        let buckets = bucket_samples(
            vec![monday(8, 5, 0), monday(8, 0, 1), monday(23, 45, 0)],
            15,
        );
        assert_eq!(buckets.len(), 96);
        assert_eq!(buckets[32].len(), 2);
        assert!(buckets[32][0].start < buckets[32][1].start);
        assert_eq!(buckets[95].len(), 1);
        assert!(buckets[0].is_empty());
    }

    #[tokio::test]
    async fn memory_store_reports_empty_until_saved() {
        let store = MemoryStore::new(15);
        assert_eq!(store.open().await.unwrap(), StoreStatus::Empty);

        store.stage_samples(vec![monday(8, 0, 0), monday(8, 0, 1)]).await;
        assert_eq!(store.open().await.unwrap(), StoreStatus::Empty);

        assert_eq!(store.save().await.unwrap(), 2);
        assert_eq!(store.open().await.unwrap(), StoreStatus::Ready);
    }

    #[tokio::test]
    async fn memory_store_dedupes_and_filters_by_weekday() {
        let store = MemoryStore::new(15);
        let tuesday = sample_at(
            NaiveDate::from_ymd_opt(2026, 3, 3)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            15,
        );
        store
            .stage_samples(vec![monday(8, 0, 0), monday(8, 0, 0), tuesday])
            .await;
        assert_eq!(store.save().await.unwrap(), 2);

        let buckets = store.records_for_weekday(Weekday::Mon).await.unwrap();
        assert_eq!(buckets[32].len(), 1);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), 1);
    }
}
