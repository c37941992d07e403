use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::warn;

use crate::error::NetStatsError;
use crate::models::{RawSample, SlotSummary};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub summaries: Vec<SlotSummary>,
    pub corrupt_buckets: Vec<usize>,
    pub bucket_count: usize,
}

/// Reduces every bucket of one weekday to a summary anchored on `date`.
///
/// Empty buckets are reported and left out; the remaining buckets are
/// summarised independently of each other.
pub fn aggregate(buckets: &[Vec<RawSample>], date: NaiveDate) -> Aggregation {
    let mut aggregation = Aggregation {
        bucket_count: buckets.len(),
        ..Aggregation::default()
    };

    for (index, bucket) in buckets.iter().enumerate() {
        match summarize_bucket(index, bucket, date) {
            Ok(summary) => aggregation.summaries.push(summary),
            Err(err) => {
                warn!(bucket = index, %date, "skipping bucket: {err}");
                aggregation.corrupt_buckets.push(index);
            }
        }
    }

    aggregation
}

pub fn summarize_bucket(
    index: usize,
    bucket: &[RawSample],
    date: NaiveDate,
) -> Result<SlotSummary, NetStatsError> {
    let first = bucket
        .first()
        .ok_or(NetStatsError::CorruptBucket { index })?;
    let weeks = bucket.len() as f64;

    let mut total_seconds = 0.0;
    let mut wifi_bytes = 0.0;
    let mut wifi_link_speed = 0.0;
    let mut wifi_signal = 0.0;
    let mut mobile_bytes = 0.0;
    let mut mobile_signal = 0.0;

    for sample in bucket {
        total_seconds += sample.elapsed_seconds();

        if sample.wifi.connected {
            wifi_bytes += (sample.wifi.data_sent + sample.wifi.data_received) as f64;
            wifi_link_speed += sample.wifi.bandwidth;
            wifi_signal += sample.wifi.signal_strength;
        }

        if sample.mobile.is_candidate() {
            mobile_bytes += (sample.mobile.data_sent + sample.mobile.data_received) as f64;
            mobile_signal += sample.mobile.signal_strength;
        }
    }

    let per_second = |bytes: f64| {
        if total_seconds > 0.0 {
            bytes / total_seconds
        } else {
            0.0
        }
    };

    // Offset from the start of the sample's own day, so the last bucket of the
    // day ends at midnight of the following day.
    let offset = first.end - first.start.date().and_time(NaiveTime::MIN);
    let time = date.and_time(NaiveTime::MIN) + Duration::minutes(offset.num_minutes());

    Ok(SlotSummary {
        bucket: index,
        time,
        avg_wifi_bytes_per_second: per_second(wifi_bytes),
        avg_wifi_link_speed: wifi_link_speed / weeks,
        avg_wifi_signal_strength: wifi_signal / weeks,
        avg_mobile_bytes_per_second: per_second(mobile_bytes),
        avg_mobile_signal_strength: mobile_signal / weeks,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{MobileReading, WifiReading};
    use chrono::{Duration, NaiveDateTime};

    pub(crate) fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    pub(crate) fn sample_at(start: NaiveDateTime, minutes: i64) -> RawSample {
        RawSample {
            start,
            end: start + Duration::minutes(minutes),
            wifi: WifiReading {
                connected: true,
                data_sent: 1_000,
                data_received: 8_000,
                bandwidth: 24.0,
                signal_strength: 60.0,
            },
            mobile: MobileReading {
                connected: true,
                metered: false,
                roaming: false,
                data_sent: 500,
                data_received: 2_500,
                signal_strength: 40.0,
            },
        }
    }

    fn weekly_samples(hour: u32, minute: u32, weeks: i64) -> Vec<RawSample> {
        (0..weeks)
            .map(|week| {
                let start = (day() - Duration::weeks(week + 1))
                    .and_hms_opt(hour, minute, 0)
                    .unwrap();
                sample_at(start, 15)
            })
            .collect()
    }

    #[test]
    fn throughput_uses_elapsed_seconds_and_readings_use_sample_count() {
        let mut bucket = weekly_samples(8, 0, 2);
        bucket[1].wifi.bandwidth = 12.0;
        bucket[1].wifi.data_received = 17_000;

        let summary = summarize_bucket(32, &bucket, day()).unwrap();
        // (9_000 + 18_000) bytes over 2 * 900 seconds
        assert!((summary.avg_wifi_bytes_per_second - 15.0).abs() < 1e-9);
        assert!((summary.avg_wifi_link_speed - 18.0).abs() < 1e-9);
        assert!((summary.avg_wifi_signal_strength - 60.0).abs() < 1e-9);
        assert!((summary.avg_mobile_bytes_per_second - 6_000.0 / 1_800.0).abs() < 1e-9);
        assert_eq!(summary.bucket, 32);
    }

    #[test]
    fn time_of_day_comes_from_first_sample_end_on_analysis_date() {
        let bucket = weekly_samples(8, 0, 3);
        let summary = summarize_bucket(0, &bucket, day()).unwrap();
        assert_eq!(summary.time, day().and_hms_opt(8, 15, 0).unwrap());
    }

    #[test]
    fn last_bucket_of_the_day_ends_at_next_midnight() {
        let buckets = vec![weekly_samples(23, 30, 2), weekly_samples(23, 45, 2)];
        let aggregation = aggregate(&buckets, day());

        let times: Vec<NaiveDateTime> = aggregation.summaries.iter().map(|s| s.time).collect();
        let next_midnight = (day() + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(times, vec![day().and_hms_opt(23, 45, 0).unwrap(), next_midnight]);
        assert!(times[0] < times[1]);
    }

    #[test]
    fn metered_mobile_contributes_nothing() {
        let mut bucket = weekly_samples(9, 0, 2);
        for sample in bucket.iter_mut() {
            sample.mobile.metered = true;
            sample.mobile.data_received = 9_000_000;
            sample.mobile.signal_strength = 99.0;
        }
        bucket[0].mobile.metered = false;
        bucket[0].mobile.roaming = true;

        let summary = summarize_bucket(0, &bucket, day()).unwrap();
        assert_eq!(summary.avg_mobile_bytes_per_second, 0.0);
        assert_eq!(summary.avg_mobile_signal_strength, 0.0);
    }

    #[test]
    fn disconnected_wifi_counts_as_zero_reading() {
        let mut bucket = weekly_samples(10, 0, 2);
        bucket[1].wifi.connected = false;

        let summary = summarize_bucket(0, &bucket, day()).unwrap();
        assert!((summary.avg_wifi_link_speed - 12.0).abs() < 1e-9);
        assert!((summary.avg_wifi_signal_strength - 30.0).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_time_yields_zero_throughput() {
        let start = day().and_hms_opt(11, 0, 0).unwrap();
        let bucket = vec![sample_at(start, 0)];
        let summary = summarize_bucket(0, &bucket, day()).unwrap();
        assert_eq!(summary.avg_wifi_bytes_per_second, 0.0);
        assert_eq!(summary.avg_mobile_bytes_per_second, 0.0);
    }

    #[test]
    fn empty_bucket_is_reported_and_siblings_survive() {
        let buckets = vec![weekly_samples(6, 0, 2), Vec::new(), weekly_samples(6, 30, 2)];

        assert_eq!(
            summarize_bucket(1, &buckets[1], day()),
            Err(NetStatsError::CorruptBucket { index: 1 })
        );

        let aggregation = aggregate(&buckets, day());
        assert_eq!(aggregation.bucket_count, 3);
        assert_eq!(aggregation.corrupt_buckets, vec![1]);
        let indexes: Vec<usize> = aggregation.summaries.iter().map(|s| s.bucket).collect();
        assert_eq!(indexes, vec![0, 2]);
    }

    #[test]
    fn averages_stay_within_contributing_bounds() {
        let mut bucket = weekly_samples(14, 0, 4);
        let speeds = [5.0, 54.0, 11.0, 2.0];
        let signals = [20.0, 90.0, 45.0, 33.0];
        for (i, sample) in bucket.iter_mut().enumerate() {
            sample.wifi.bandwidth = speeds[i];
            sample.wifi.signal_strength = signals[i];
            sample.wifi.data_received = 1_000 * (i as u64 + 1);
            sample.mobile.signal_strength = signals[3 - i];
        }

        let summary = summarize_bucket(0, &bucket, day()).unwrap();
        assert!((2.0..=54.0).contains(&summary.avg_wifi_link_speed));
        assert!((20.0..=90.0).contains(&summary.avg_wifi_signal_strength));
        assert!((20.0..=90.0).contains(&summary.avg_mobile_signal_strength));

        let rates: Vec<f64> = bucket
            .iter()
            .map(|s| (s.wifi.data_sent + s.wifi.data_received) as f64 / s.elapsed_seconds())
            .collect();
        let min = rates.iter().cloned().fold(f64::MAX, f64::min);
        let max = rates.iter().cloned().fold(f64::MIN, f64::max);
        assert!(summary.avg_wifi_bytes_per_second >= min);
        assert!(summary.avg_wifi_bytes_per_second <= max);
    }
}
