use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{debug, info};

use crate::error::NetStatsError;
use crate::models::{ClassifiedSlot, Recommendation, SelectionTier};

/// Picks the next slot to fetch in, preferring urgency over link type:
/// Wi-Fi inside the lookahead, then mobile inside the lookahead, then the
/// earliest Wi-Fi and the earliest mobile slot left today.
pub fn select_next(
    wifi_slots: &[ClassifiedSlot],
    mobile_slots: &[ClassifiedSlot],
    now: NaiveDateTime,
    lookahead: Duration,
) -> Recommendation {
    let horizon = now + lookahead;
    let wifi = upcoming(wifi_slots, now);
    let mobile = upcoming(mobile_slots, now);

    let found = |slot: &ClassifiedSlot, tier: SelectionTier| {
        info!(time = %slot.time(), tier = tier.label(), "selected fetch slot");
        Recommendation::Found {
            slot: slot.clone(),
            tier,
        }
    };

    if let Some(slot) = best_by(&within(&wifi, horizon), |s| s.summary.avg_wifi_link_speed) {
        return found(slot, SelectionTier::WifiWithinLookahead);
    }

    if let Some(slot) = best_by(&within(&mobile, horizon), |s| {
        s.summary.avg_mobile_signal_strength
    }) {
        return found(slot, SelectionTier::MobileWithinLookahead);
    }

    if let Some(slot) = earliest(&wifi) {
        return found(slot, SelectionTier::EarliestWifi);
    }

    if let Some(slot) = earliest(&mobile) {
        return found(slot, SelectionTier::EarliestMobile);
    }

    info!(%now, "no usable slot left today");
    Recommendation::NoneToday
}

fn upcoming(slots: &[ClassifiedSlot], now: NaiveDateTime) -> Vec<&ClassifiedSlot> {
    slots.iter().filter(|slot| slot.time() >= now).collect()
}

fn within<'a>(slots: &[&'a ClassifiedSlot], horizon: NaiveDateTime) -> Vec<&'a ClassifiedSlot> {
    if slots.is_empty() {
        return Vec::new();
    }
    slots
        .iter()
        .copied()
        .filter(|slot| slot.time() < horizon)
        .collect()
}

/// Highest score wins; equal scores go to the earlier slot.
fn best_by<'a>(
    candidates: &[&'a ClassifiedSlot],
    score: impl Fn(&ClassifiedSlot) -> f64,
) -> Option<&'a ClassifiedSlot> {
    let mut best: Option<&'a ClassifiedSlot> = None;
    for &slot in candidates {
        best = match best {
            None => Some(slot),
            Some(current) => {
                let (a, b) = (score(slot), score(current));
                if a > b || (a == b && slot.time() < current.time()) {
                    Some(slot)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

fn earliest<'a>(slots: &[&'a ClassifiedSlot]) -> Option<&'a ClassifiedSlot> {
    slots.iter().copied().min_by_key(|slot| slot.time())
}

/// Walks the full-day usability sequence from the first bucket boundary at or
/// after `now` and returns the start of the first usable bucket.
pub fn select_by_coarse_window(
    usable: &[bool],
    now: NaiveDateTime,
    delta_minutes: u32,
) -> Result<NaiveDateTime, NetStatsError> {
    if delta_minutes == 0 {
        return Err(NetStatsError::NoGoodTimeToday);
    }

    let current_minutes = now.hour() * 60 + now.minute();
    let start_index = current_minutes.div_ceil(delta_minutes) as usize;

    let found = usable
        .iter()
        .enumerate()
        .skip(start_index)
        .find_map(|(index, good)| good.then_some(index))
        .ok_or(NetStatsError::NoGoodTimeToday)?;

    let boundary = start_index as i64 * i64::from(delta_minutes);
    let offset = (found - start_index) as i64 * i64::from(delta_minutes);
    let midnight = now.date().and_time(chrono::NaiveTime::MIN);
    let at = midnight + Duration::minutes(boundary + offset);
    debug!(start_index, found, %at, "coarse window match");
    Ok(at)
}
