use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SeedPlan;
use crate::models::{MobileReading, RawSample, WifiReading};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Place {
    Home,
    Commute,
    Office,
}

fn place_at(weekday: Weekday, minute_of_day: u32) -> Place {
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return Place::Home;
    }
    match minute_of_day {
        510..=554 | 1020..=1079 => Place::Commute,
        555..=1019 => Place::Office,
        _ => Place::Home,
    }
}

/// Synthesises `plan.weeks` weeks of samples ending the day before `today`,
/// one sample per bucket. The same plan always yields the same samples.
pub fn generate(plan: &SeedPlan, bucket_minutes: u32, today: NaiveDate) -> Vec<RawSample> {
    let bucket_minutes = bucket_minutes.max(1);
    let mut rng = StdRng::seed_from_u64(plan.rng_seed);
    let days = i64::from(plan.weeks) * 7;
    let buckets = 1440 / bucket_minutes;
    let seconds = f64::from(bucket_minutes * 60);
    let mut samples = Vec::with_capacity(days as usize * buckets as usize);

    for offset in (1..=days).rev() {
        let date = today - Duration::days(offset);
        let midnight = date.and_time(NaiveTime::MIN);

        for bucket in 0..buckets {
            let minute_of_day = bucket * bucket_minutes;
            let start = midnight + Duration::minutes(i64::from(minute_of_day));
            let end = start + Duration::minutes(i64::from(bucket_minutes));
            let place = place_at(date.weekday(), minute_of_day);
            let evening = minute_of_day >= 1140;

            let dropout = place != Place::Commute && rng.gen_bool(0.05);
            let wifi = match place {
                _ if dropout => disconnected_wifi(),
                Place::Commute => disconnected_wifi(),
                Place::Home => {
                    let rate = if evening {
                        rng.gen_range(20_000.0..60_000.0)
                    } else {
                        rng.gen_range(300.0..4_000.0)
                    };
                    let speed = rng_speed(&mut rng, 24.0, 72.0);
                    wifi_reading(&mut rng, rate * seconds, speed, 45.0..85.0)
                }
                Place::Office => {
                    let rate = rng.gen_range(1_500.0..25_000.0);
                    let speed = rng_speed(&mut rng, 54.0, 150.0);
                    wifi_reading(&mut rng, rate * seconds, speed, 20.0..70.0)
                }
            };

            let metered = place == Place::Commute && rng.gen_bool(0.3);
            let rate = match place {
                Place::Commute => rng.gen_range(300.0..6_000.0),
                _ => rng.gen_range(0.0..400.0),
            };
            let total = (rate * seconds) as u64;
            let mobile = MobileReading {
                connected: true,
                metered,
                roaming: false,
                data_sent: total / 10,
                data_received: total - total / 10,
                signal_strength: rng.gen_range(15.0..65.0),
            };

            samples.push(RawSample {
                start,
                end,
                wifi,
                mobile,
            });
        }
    }

    samples
}

fn disconnected_wifi() -> WifiReading {
    WifiReading {
        connected: false,
        data_sent: 0,
        data_received: 0,
        bandwidth: 0.0,
        signal_strength: 0.0,
    }
}

fn rng_speed(rng: &mut StdRng, low: f64, high: f64) -> f64 {
    rng.gen_range(low..high).round()
}

fn wifi_reading(
    rng: &mut StdRng,
    bytes: f64,
    bandwidth: f64,
    signal: std::ops::Range<f64>,
) -> WifiReading {
    let total = bytes as u64;
    WifiReading {
        connected: true,
        data_sent: total / 10,
        data_received: total - total / 10,
        bandwidth,
        signal_strength: rng.gen_range(signal),
    }
}
