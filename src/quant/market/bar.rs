//! # Bars
//!
//! Daily OHLCV klines as delivered by the exchange. Only `close` and
//! `close_time` feed the analytics; the rest is carried for completeness.

use chrono::DateTime;
use chrono::NaiveDate;
use impl_new_derive::ImplNew;

use crate::error::AnalyticsError;
use crate::error::Result;

/// One daily kline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bar {
  /// Open time in Unix milliseconds.
  pub open_time: i64,
  pub open: f64,
  pub high: f64,
  pub low: f64,
  pub close: f64,
  /// Base asset volume.
  pub volume: f64,
  /// Close time in Unix milliseconds.
  pub close_time: i64,
  pub quote_volume: f64,
  pub trade_count: u64,
  pub taker_buy_base: f64,
  pub taker_buy_quote: f64,
}

impl Bar {
  /// UTC calendar date of the bar's close time.
  pub fn close_date(&self) -> Result<NaiveDate> {
    DateTime::from_timestamp_millis(self.close_time)
      .map(|dt| dt.date_naive())
      .ok_or_else(|| {
        AnalyticsError::InvalidInput(format!("close time {} out of range", self.close_time))
      })
  }

  /// Parse an exchange kline row.
  ///
  /// Field order: open time, open, high, low, close, volume, close time,
  /// quote volume, trade count, taker buy base, taker buy quote and an
  /// optional trailing "ignore" field.
  pub fn from_record(fields: &[&str], line: usize) -> Result<Self> {
    if fields.len() != 11 && fields.len() != 12 {
      return Err(AnalyticsError::Parse {
        line,
        reason: format!("expected 11 or 12 fields, got {}", fields.len()),
      });
    }

    let float = |idx: usize| -> Result<f64> {
      fields[idx]
        .trim()
        .parse::<f64>()
        .map_err(|e| AnalyticsError::Parse {
          line,
          reason: format!("field {idx} ({:?}): {e}", fields[idx]),
        })
    };
    let int = |idx: usize| -> Result<i64> {
      fields[idx]
        .trim()
        .parse::<i64>()
        .map_err(|e| AnalyticsError::Parse {
          line,
          reason: format!("field {idx} ({:?}): {e}", fields[idx]),
        })
    };

    let trade_count = int(8)?;
    if trade_count < 0 {
      return Err(AnalyticsError::Parse {
        line,
        reason: format!("negative trade count {trade_count}"),
      });
    }

    Ok(Self {
      open_time: int(0)?,
      open: float(1)?,
      high: float(2)?,
      low: float(3)?,
      close: float(4)?,
      volume: float(5)?,
      close_time: int(6)?,
      quote_volume: float(7)?,
      trade_count: trade_count as u64,
      taker_buy_base: float(9)?,
      taker_buy_quote: float(10)?,
    })
  }
}

/// Daily bars of one asset, oldest first.
#[derive(ImplNew, Clone, Debug)]
pub struct AssetBars {
  /// Trading pair symbol, e.g. `BTCUSDT`.
  pub symbol: String,
  pub bars: Vec<Bar>,
}
