//! 歷史 K 線數據的讀取邊界
//!
//! 計算核心只依賴 [`CandleLoader`]，具體的存儲方式由實現者決定。

pub mod csv_loader;
pub mod loader;

pub use csv_loader::{CsvCandleLoader, CsvLoaderOptions, KLINE_COLUMNS, KLINE_HEADERS};
pub use loader::{CandleLoader, LoaderError};
