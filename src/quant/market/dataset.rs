//! # Market Dataset
//!
//! $$
//! P_{i,t} = \text{close}_{i,t},\qquad \text{cap}_{i,t} = \operatorname{trunc}(P_{i,t} S_i)
//! $$
//!
//! Close-price and market-cap tables on a shared daily calendar.

use std::collections::HashMap;

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;
use tracing::warn;

use super::bar::AssetBars;
use super::panel::MarketCapTable;
use super::panel::PriceTable;
use crate::error::AnalyticsError;
use crate::error::Result;

/// `2^63`, the first `f64` that no longer fits into an `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// What to do with assets that have prices but no circulating supply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SupplyPolicy {
  /// Keep the asset everywhere except market-cap tables, CWI and MCAP, and
  /// report it in [`MarketDataset::missing_supply`].
  #[default]
  Exclude,
  /// Raise [`AnalyticsError::MissingSupply`].
  Fail,
}

/// Last known circulating supply per symbol.
///
/// A single snapshot, not a time series: historical market caps are computed
/// with today's supply, which may not have been in effect on earlier dates.
#[derive(Clone, Debug, Default)]
pub struct CirculatingSupply {
  values: HashMap<String, f64>,
}

impl CirculatingSupply {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or replace the supply of `symbol`.
  pub fn insert(&mut self, symbol: impl Into<String>, supply: f64) -> Result<()> {
    let symbol = symbol.into();
    if !supply.is_finite() || supply < 0.0 {
      return Err(AnalyticsError::InvalidInput(format!(
        "circulating supply of {symbol} must be finite and non-negative, got {supply}"
      )));
    }
    self.values.insert(symbol, supply);
    Ok(())
  }

  pub fn get(&self, symbol: &str) -> Option<f64> {
    self.values.get(symbol).copied()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Parse `SYMBOL SUPPLY` lines. Blank lines and `#` comments are skipped.
  pub fn parse(text: &str) -> Result<Self> {
    let mut supply = Self::new();
    for (i, raw) in text.lines().enumerate() {
      let line = raw.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }

      let mut parts = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty());
      let (Some(symbol), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AnalyticsError::Parse {
          line: i + 1,
          reason: format!("expected `SYMBOL SUPPLY`, got {line:?}"),
        });
      };
      let value = value.parse::<f64>().map_err(|e| AnalyticsError::Parse {
        line: i + 1,
        reason: format!("supply {value:?}: {e}"),
      })?;
      supply.insert(symbol, value)?;
    }
    Ok(supply)
  }
}

/// Price and market-cap tables derived from raw bars.
#[derive(Clone, Debug)]
pub struct MarketDataset {
  close: PriceTable,
  market_cap: MarketCapTable,
  missing_supply: Vec<String>,
}

impl MarketDataset {
  /// Build both tables. Bars must share one contiguous daily calendar.
  pub fn from_bars(
    assets: &[AssetBars],
    supply: &CirculatingSupply,
    policy: SupplyPolicy,
  ) -> Result<Self> {
    let close = close_price_table(assets)?;
    let (market_cap, missing_supply) = market_cap_table(&close, supply)?;

    if !missing_supply.is_empty() {
      match policy {
        SupplyPolicy::Fail => {
          return Err(AnalyticsError::MissingSupply {
            symbols: missing_supply,
          })
        }
        SupplyPolicy::Exclude => warn!(
          symbols = ?missing_supply,
          "missing circulating supply, excluding from market-cap aggregation"
        ),
      }
    }

    debug!(
      dates = close.n_rows(),
      assets = close.n_cols(),
      capped = market_cap.n_cols(),
      "market dataset ready"
    );

    Ok(Self {
      close,
      market_cap,
      missing_supply,
    })
  }

  pub fn close_prices(&self) -> &PriceTable {
    &self.close
  }

  /// Market caps, restricted to assets with a supply figure.
  pub fn market_cap(&self) -> &MarketCapTable {
    &self.market_cap
  }

  /// Assets priced but excluded from market-cap aggregation.
  pub fn missing_supply(&self) -> &[String] {
    &self.missing_supply
  }

  /// Total market cap per date.
  pub fn market_cap_total(&self) -> Result<Array1<i64>> {
    self
      .market_cap
      .values()
      .rows()
      .into_iter()
      .zip(self.market_cap.dates())
      .map(|(row, date)| {
        row
          .iter()
          .try_fold(0i64, |acc, &v| acc.checked_add(v))
          .ok_or_else(|| AnalyticsError::IntegerOverflow {
            symbol: format!("total on {date}"),
            value: row.iter().map(|&v| v as f64).sum(),
          })
      })
      .collect()
  }
}

/// Close prices indexed by the close date of the first asset's bars.
pub fn close_price_table(assets: &[AssetBars]) -> Result<PriceTable> {
  let reference = assets
    .first()
    .ok_or_else(|| AnalyticsError::InvalidInput("no assets supplied".to_string()))?;
  let dates = reference
    .bars
    .iter()
    .map(|b| b.close_date())
    .collect::<Result<Vec<NaiveDate>>>()?;

  if dates.len() < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      actual: dates.len(),
    });
  }

  for pair in dates.windows(2) {
    if pair[0].succ_opt() != Some(pair[1]) {
      return Err(AnalyticsError::MisalignedCalendar {
        symbol: reference.symbol.clone(),
        reason: format!("{} is not followed by the next day ({})", pair[0], pair[1]),
      });
    }
  }

  let mut columns: Vec<String> = Vec::with_capacity(assets.len());
  let mut values = Array2::<f64>::zeros((dates.len(), assets.len()));

  for (j, asset) in assets.iter().enumerate() {
    if columns.contains(&asset.symbol) {
      return Err(AnalyticsError::InvalidInput(format!(
        "duplicate asset {}",
        asset.symbol
      )));
    }
    if asset.bars.len() != dates.len() {
      return Err(AnalyticsError::MisalignedCalendar {
        symbol: asset.symbol.clone(),
        reason: format!(
          "{} bars, reference {} has {}",
          asset.bars.len(),
          reference.symbol,
          dates.len()
        ),
      });
    }

    for (i, (bar, date)) in asset.bars.iter().zip(&dates).enumerate() {
      let own = bar.close_date()?;
      if own != *date {
        return Err(AnalyticsError::MisalignedCalendar {
          symbol: asset.symbol.clone(),
          reason: format!("row {i} closes on {own}, reference closes on {date}"),
        });
      }
      values[[i, j]] = bar.close;
    }
    columns.push(asset.symbol.clone());
  }

  PriceTable::new(dates, columns, values)
}

/// Market caps for every asset that has a supply, plus the symbols that do not.
pub fn market_cap_table(
  close: &PriceTable,
  supply: &CirculatingSupply,
) -> Result<(MarketCapTable, Vec<String>)> {
  let mut columns = Vec::new();
  let mut missing = Vec::new();
  let mut series = Vec::new();

  for (j, symbol) in close.columns().iter().enumerate() {
    let Some(s) = supply.get(symbol) else {
      missing.push(symbol.clone());
      continue;
    };

    let caps = close
      .values()
      .column(j)
      .iter()
      .map(|&p| truncate_cap(symbol, p * s))
      .collect::<Result<Vec<i64>>>()?;
    columns.push(symbol.clone());
    series.push(caps);
  }

  let mut values = Array2::<i64>::zeros((close.n_rows(), columns.len()));
  for (j, caps) in series.iter().enumerate() {
    for (i, &cap) in caps.iter().enumerate() {
      values[[i, j]] = cap;
    }
  }

  Ok((
    MarketCapTable::new(close.dates().to_vec(), columns, values)?,
    missing,
  ))
}

fn truncate_cap(symbol: &str, value: f64) -> Result<i64> {
  let t = value.trunc();
  if !t.is_finite() || t >= I64_BOUND || t < -I64_BOUND {
    return Err(AnalyticsError::IntegerOverflow {
      symbol: symbol.to_string(),
      value,
    });
  }
  Ok(t as i64)
}

#[cfg(test)]
mod tests {
  use tracing_test::traced_test;

  use super::*;
  use crate::quant::market::Bar;

  const DAY_MS: i64 = 86_400_000;
  const START_MS: i64 = 1_700_006_399_999;

  fn bars(closes: &[f64]) -> Vec<Bar> {
    closes
      .iter()
      .enumerate()
      .map(|(i, &close)| Bar {
        close,
        close_time: START_MS + i as i64 * DAY_MS,
        ..Bar::default()
      })
      .collect()
  }

  fn two_assets() -> Vec<AssetBars> {
    vec![
      AssetBars::new("AAA".into(), bars(&[100.0, 110.0, 121.0])),
      AssetBars::new("BBB".into(), bars(&[50.0, 55.0, 60.5])),
    ]
  }

  #[test]
  fn close_prices_follow_reference_calendar() {
    let table = close_price_table(&two_assets()).unwrap();
    assert_eq!(table.n_rows(), 3);
    assert_eq!(table.columns(), ["AAA", "BBB"]);
    let d0 = table.dates()[0];
    assert_eq!(table.dates()[2], d0 + chrono::Days::new(2));
    assert_eq!(table.get(d0, "BBB"), Some(&50.0));
  }

  #[test]
  fn rejects_length_mismatch() {
    let mut assets = two_assets();
    assets[1].bars.pop();
    let err = close_price_table(&assets).unwrap_err();
    assert!(matches!(
      err,
      AnalyticsError::MisalignedCalendar { ref symbol, .. } if symbol == "BBB"
    ));
  }

  #[test]
  fn rejects_shifted_dates() {
    let mut assets = two_assets();
    for bar in &mut assets[1].bars {
      bar.close_time += DAY_MS;
    }
    let err = close_price_table(&assets).unwrap_err();
    assert!(matches!(err, AnalyticsError::MisalignedCalendar { .. }));
  }

  #[test]
  fn rejects_calendar_gaps() {
    let mut assets = two_assets();
    for asset in &mut assets {
      asset.bars[2].close_time += DAY_MS;
    }
    let err = close_price_table(&assets).unwrap_err();
    assert!(err.to_string().contains("next day"));
  }

  #[test]
  fn needs_two_dates() {
    let assets = vec![AssetBars::new("AAA".into(), bars(&[1.0]))];
    assert!(matches!(
      close_price_table(&assets),
      Err(AnalyticsError::InsufficientData {
        required: 2,
        actual: 1
      })
    ));
  }

  #[test]
  fn market_cap_truncates_toward_zero_in_64_bits() {
    let assets = vec![AssetBars::new("BTC".into(), bars(&[30_000.75, 31_000.25]))];
    let close = close_price_table(&assets).unwrap();
    let supply = CirculatingSupply::parse("BTC 19500000.5").unwrap();
    let (caps, missing) = market_cap_table(&close, &supply).unwrap();

    assert!(missing.is_empty());
    // Far beyond i32::MAX.
    assert_eq!(caps.values()[[0, 0]], 585_014_640_000);
    assert_eq!(caps.values()[[1, 0]], 604_504_890_500);
  }

  #[test]
  fn market_cap_overflow_is_reported() {
    let assets = vec![AssetBars::new("BIG".into(), bars(&[1e10, 1e10]))];
    let close = close_price_table(&assets).unwrap();
    let supply = CirculatingSupply::parse("BIG 1e10").unwrap();
    assert!(matches!(
      market_cap_table(&close, &supply),
      Err(AnalyticsError::IntegerOverflow { .. })
    ));
  }

  #[test]
  #[traced_test]
  fn missing_supply_is_excluded_and_logged() {
    let supply = CirculatingSupply::parse("AAA 10\n").unwrap();
    let ds = MarketDataset::from_bars(&two_assets(), &supply, SupplyPolicy::Exclude).unwrap();

    assert_eq!(ds.missing_supply(), ["BBB"]);
    assert_eq!(ds.market_cap().columns(), ["AAA"]);
    assert_eq!(ds.close_prices().columns(), ["AAA", "BBB"]);
    assert_eq!(ds.market_cap_total().unwrap().to_vec(), vec![1000, 1100, 1210]);
    assert!(logs_contain("missing circulating supply"));
  }

  #[test]
  fn missing_supply_can_fail() {
    let supply = CirculatingSupply::parse("AAA 10").unwrap();
    let err = MarketDataset::from_bars(&two_assets(), &supply, SupplyPolicy::Fail).unwrap_err();
    assert!(matches!(
      err,
      AnalyticsError::MissingSupply { ref symbols } if symbols == &["BBB".to_string()]
    ));
  }

  #[test]
  fn supply_parser_handles_comments_and_errors() {
    let supply = CirculatingSupply::parse("# snapshot\nAAA 10\n\nBBB,2.5\n").unwrap();
    assert_eq!(supply.len(), 2);
    assert_eq!(supply.get("BBB"), Some(2.5));

    assert!(matches!(
      CirculatingSupply::parse("AAA"),
      Err(AnalyticsError::Parse { line: 1, .. })
    ));
    assert!(CirculatingSupply::parse("AAA -1").is_err());
  }
}
