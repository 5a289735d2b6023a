pub mod candle;
pub mod error;
pub mod frequency;
pub mod indicators;
pub mod resampler;
pub mod series;

pub use candle::{time_unit, Candle};
pub use error::{CandleError, CandleResult, Discontinuity};
pub use frequency::{Frequency, UnknownFrequency};
pub use indicators::{
    FastStochastic, IndicatorsExt, SlowStochastic, StochasticEngine, StochasticSnapshot,
    INDICATOR_SCALE, STOCHASTIC_EPSILON,
};
pub use resampler::Resampler;
pub use series::{AppendOutcome, AppendStats, CandleSeries, GapPolicy, DEFAULT_MAX_BACKFILL_BARS};
