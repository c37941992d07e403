use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct WifiReading {
    pub connected: bool,
    pub data_sent: u64,
    pub data_received: u64,
    pub bandwidth: f64,
    pub signal_strength: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobileReading {
    pub connected: bool,
    pub metered: bool,
    pub roaming: bool,
    pub data_sent: u64,
    pub data_received: u64,
    pub signal_strength: f64,
}

impl MobileReading {
    /// Metered and roaming connections never count towards mobile quality.
    pub fn is_candidate(&self) -> bool {
        self.connected && !self.metered && !self.roaming
    }
}

/// One measurement interval as recorded by the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub wifi: WifiReading,
    pub mobile: MobileReading,
}

impl RawSample {
    pub fn elapsed_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Time-of-day buckets for one weekday, each holding one sample per observed week.
pub type WeekdayBuckets = Vec<Vec<RawSample>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub bucket: usize,
    pub time: NaiveDateTime,
    pub avg_wifi_bytes_per_second: f64,
    pub avg_wifi_link_speed: f64,
    pub avg_wifi_signal_strength: f64,
    pub avg_mobile_bytes_per_second: f64,
    pub avg_mobile_signal_strength: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSlot {
    pub summary: SlotSummary,
    pub wifi_usable: bool,
    pub mobile_usable: bool,
}

impl ClassifiedSlot {
    pub fn time(&self) -> NaiveDateTime {
        self.summary.time
    }
}

/// Which rule of the selection policy produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    WifiWithinLookahead,
    MobileWithinLookahead,
    EarliestWifi,
    EarliestMobile,
}

impl SelectionTier {
    pub fn label(self) -> &'static str {
        match self {
            SelectionTier::WifiWithinLookahead => "best Wi-Fi within the hour",
            SelectionTier::MobileWithinLookahead => "best mobile within the hour",
            SelectionTier::EarliestWifi => "earliest Wi-Fi later today",
            SelectionTier::EarliestMobile => "earliest mobile later today",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    Found {
        slot: ClassifiedSlot,
        tier: SelectionTier,
    },
    NoneToday,
}

impl Recommendation {
    pub fn slot(&self) -> Option<&ClassifiedSlot> {
        match self {
            Recommendation::Found { slot, .. } => Some(slot),
            Recommendation::NoneToday => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveLinkInfo {
    pub connected: bool,
    pub link_speed: f64,
    pub signal_strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Ready,
    Empty,
    Error,
}
