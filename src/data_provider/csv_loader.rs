//! 交易所 kline CSV 讀寫
//!
//! 每行 12 欄：開盤時間(ms)、開、高、低、收、成交量、收盤時間(ms)、
//! 成交額、成交筆數、主動買入成交量、主動買入成交額、忽略欄。

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::data_provider::loader::{CandleLoader, LoaderError};
use crate::domain_types::candle::Candle;
use crate::utils::time_utils::{datetime_to_timestamp_ms, timestamp_ms_to_datetime};

/// kline CSV 的欄位數量
pub const KLINE_COLUMNS: usize = 12;

/// kline CSV 的欄位名稱，寫出標題行時使用
pub const KLINE_HEADERS: [&str; KLINE_COLUMNS] = [
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "quote_asset_volume",
    "number_of_trades",
    "taker_buy_base_asset_volume",
    "taker_buy_quote_asset_volume",
    "ignore",
];

/// CSV 讀取選項
#[derive(Debug, Clone)]
pub struct CsvLoaderOptions {
    /// 是否有標題行，交易所導出的文件預設沒有
    pub has_header: bool,
    /// 分隔符
    pub delimiter: u8,
}

impl Default for CsvLoaderOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            delimiter: b',',
        }
    }
}

/// 從 kline CSV 文件加載 K 線
#[derive(Debug, Clone)]
pub struct CsvCandleLoader {
    path: PathBuf,
    options: CsvLoaderOptions,
}

impl CsvCandleLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: CsvLoaderOptions::default(),
        }
    }

    /// 設定是否有標題行
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.options.has_header = has_header;
        self
    }

    /// 設定分隔符
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 將 K 線寫成 kline CSV
    pub fn write<P: AsRef<Path>>(
        path: P,
        candles: &[Candle],
        with_header: bool,
    ) -> Result<(), LoaderError> {
        let mut writer = WriterBuilder::new().has_headers(false).from_path(path.as_ref())?;

        if with_header {
            writer.write_record(KLINE_HEADERS)?;
        }
        for candle in candles {
            writer.write_record(to_record(candle))?;
        }
        writer.flush()?;

        debug!(path = %path.as_ref().display(), count = candles.len(), "K 線寫入 CSV");
        Ok(())
    }
}

impl CandleLoader for CsvCandleLoader {
    fn load(&self) -> Result<Vec<Candle>, LoaderError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(self.options.has_header)
            .delimiter(self.options.delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&self.path)?;

        let mut candles = Vec::new();
        for record in reader.records() {
            candles.push(parse_record(&record?)?);
        }

        info!(path = %self.path.display(), count = candles.len(), "從 CSV 加載 K 線");
        Ok(candles)
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|position| position.line()).unwrap_or(0)
}

fn parse_timestamp(record: &StringRecord, index: usize) -> Result<DateTime<Utc>, LoaderError> {
    let value = &record[index];
    value
        .parse::<i64>()
        .ok()
        .and_then(timestamp_ms_to_datetime)
        .ok_or_else(|| LoaderError::InvalidTimestamp {
            line: line_of(record),
            value: value.to_string(),
        })
}

fn parse_decimal(record: &StringRecord, index: usize) -> Result<Decimal, LoaderError> {
    let value = &record[index];
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| LoaderError::InvalidField {
            line: line_of(record),
            column: KLINE_HEADERS[index],
            value: value.to_string(),
        })
}

fn parse_record(record: &StringRecord) -> Result<Candle, LoaderError> {
    if record.len() != KLINE_COLUMNS {
        return Err(LoaderError::ColumnCount {
            line: line_of(record),
            expected: KLINE_COLUMNS,
            actual: record.len(),
        });
    }

    let number_of_trades = record[8].parse::<u64>().map_err(|_| LoaderError::InvalidField {
        line: line_of(record),
        column: KLINE_HEADERS[8],
        value: record[8].to_string(),
    })?;

    Ok(Candle {
        open_time: parse_timestamp(record, 0)?,
        open_price: parse_decimal(record, 1)?,
        high_price: parse_decimal(record, 2)?,
        low_price: parse_decimal(record, 3)?,
        close_price: parse_decimal(record, 4)?,
        volume: parse_decimal(record, 5)?,
        close_time: parse_timestamp(record, 6)?,
        quote_asset_volume: parse_decimal(record, 7)?,
        number_of_trades,
        taker_buy_base_asset_volume: parse_decimal(record, 9)?,
        taker_buy_quote_asset_volume: parse_decimal(record, 10)?,
        ignore: parse_decimal(record, 11)?,
    })
}

fn to_record(candle: &Candle) -> [String; KLINE_COLUMNS] {
    [
        datetime_to_timestamp_ms(&candle.open_time).to_string(),
        candle.open_price.to_string(),
        candle.high_price.to_string(),
        candle.low_price.to_string(),
        candle.close_price.to_string(),
        candle.volume.to_string(),
        datetime_to_timestamp_ms(&candle.close_time).to_string(),
        candle.quote_asset_volume.to_string(),
        candle.number_of_trades.to_string(),
        candle.taker_buy_base_asset_volume.to_string(),
        candle.taker_buy_quote_asset_volume.to_string(),
        candle.ignore.to_string(),
    ]
}
