#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WrapError {
    /// Maintenance ran too late: the low word moved at least `limit` ticks
    /// since the previous call, so a wrap may have gone unnoticed.
    #[error("low word advanced {advance} ticks between maintenance calls (limit {limit})")]
    ViolatedInvariant { advance: u64, limit: u64 },

    #[error("advance limit {requested} is outside 1..={max}")]
    InvalidLimit { requested: u64, max: u64 },
}
