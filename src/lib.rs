// 模組定義
pub mod config;
pub mod data_provider;
pub mod domain_types;
pub mod monitor;
pub mod utils;

pub use domain_types::{
    Candle, CandleError, CandleResult, CandleSeries, Frequency, GapPolicy, IndicatorsExt,
    Resampler, StochasticEngine,
};
