use chrono::NaiveDateTime;

use crate::config::SlotThresholds;
use crate::models::{ClassifiedSlot, SlotSummary};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Every summary with its usability flags, past slots included.
    pub all: Vec<ClassifiedSlot>,
    pub wifi_slots: Vec<ClassifiedSlot>,
    pub mobile_slots: Vec<ClassifiedSlot>,
}

impl SlotThresholds {
    pub fn wifi_usable(&self, summary: &SlotSummary) -> bool {
        summary.avg_wifi_link_speed >= self.wifi_min_link_speed
            && summary.avg_wifi_bytes_per_second >= self.wifi_min_bytes_per_second
            && summary.avg_wifi_bytes_per_second <= self.wifi_max_bytes_per_second
            && summary.avg_wifi_signal_strength >= self.wifi_min_signal_strength
    }

    pub fn mobile_usable(&self, summary: &SlotSummary) -> bool {
        summary.avg_mobile_bytes_per_second >= self.mobile_min_bytes_per_second
            && summary.avg_mobile_bytes_per_second <= self.mobile_max_bytes_per_second
            && summary.avg_mobile_signal_strength >= self.mobile_min_signal_strength
    }
}

pub fn classify(
    summaries: &[SlotSummary],
    thresholds: &SlotThresholds,
    now: NaiveDateTime,
) -> Classification {
    let mut classification = Classification::default();

    for summary in summaries {
        let slot = ClassifiedSlot {
            wifi_usable: thresholds.wifi_usable(summary),
            mobile_usable: thresholds.mobile_usable(summary),
            summary: summary.clone(),
        };

        if slot.time() >= now {
            if slot.wifi_usable {
                classification.wifi_slots.push(slot.clone());
            } else if slot.mobile_usable {
                classification.mobile_slots.push(slot.clone());
            }
        }

        classification.all.push(slot);
    }

    classification
}
