/// Failures surfaced by the planner. `NoGoodTimeToday` is a terminal outcome
/// of coarse selection, not a fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetStatsError {
    #[error("sample store is not available; run init first")]
    StoreUnavailable,

    #[error("failed to open sample store: {reason}")]
    StoreOpenFailed { reason: String },

    #[error("sample store query failed: {reason}")]
    StoreQueryFailed { reason: String },

    #[error("bucket {index} holds no samples")]
    CorruptBucket { index: usize },

    #[error("no good connection time was found for today")]
    NoGoodTimeToday,

    #[error("store operation cancelled")]
    Cancelled,
}
