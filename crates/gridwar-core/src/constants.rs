/// Largest supported grid side length. Keeps `env_size²` cell counts addressable.
pub const MAX_ENV_SIZE: usize = 4096;

/// Most defensive strategy value.
pub const STRATEGY_MIN: i32 = -10;

/// Most aggressive strategy value.
pub const STRATEGY_MAX: i32 = 10;

/// Number of histogram bins needed to cover `STRATEGY_MIN..=STRATEGY_MAX`.
pub const STRATEGY_BINS: usize = (STRATEGY_MAX - STRATEGY_MIN + 1) as usize;

/// First ChaCha stream number handed out to per-agent tie-break streams.
/// World-level streams live below this value.
pub const AGENT_STREAM_BASE: u64 = 1 << 32;
