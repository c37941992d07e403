use tracing::debug;

use crate::config::FetchThresholds;
use crate::models::LiveLinkInfo;

/// Source of the instantaneous link reading.
pub trait LinkProbe {
    fn current_link_info(&self) -> LiveLinkInfo;
}

/// Probe that always reports the same reading, e.g. one passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub LiveLinkInfo);

impl LinkProbe for FixedProbe {
    fn current_link_info(&self) -> LiveLinkInfo {
        self.0
    }
}

pub fn is_fetchable_now(info: &LiveLinkInfo, thresholds: &FetchThresholds) -> bool {
    let fetchable = info.connected
        && info.link_speed > thresholds.link_speed_above
        && info.signal_strength > thresholds.signal_strength_above;
    debug!(?info, fetchable, "live link admission check");
    fetchable
}
