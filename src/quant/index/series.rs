//! # Index Series
//!
//! $$
//! I_0 = 100,\qquad I_t = I_{t-1}(1 + x_t)
//! $$
//!
//! Index levels built as an accumulation of per-date increments seeded at 100.

use std::fmt::Display;

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Axis;
use tracing::debug;

use super::returns::normalized_prices;
use super::weights::cap_weights;
use super::weights::equal_weights;
use super::weights::lagged_weighted_returns;
use super::weights::price_weights;
use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::market::MarketCapTable;
use crate::quant::market::Panel;
use crate::quant::market::PriceTable;
use crate::quant::market::ReturnTable;

/// Level of every index on its first date.
pub const INDEX_BASE: f64 = 100.0;

/// Index weighting scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKind {
  /// Sum of prices relative to the first date's sum.
  PriceWeighted,
  /// Daily rebalanced to `1/n`, compounding the mean log return.
  EqualWeighted,
  /// Previous-date cap weights, compounding the weighted log return.
  CapWeighted,
}

impl IndexKind {
  /// Short column label (`PWI`, `EWI`, `CWI`).
  pub fn label(&self) -> &'static str {
    match self {
      IndexKind::PriceWeighted => "PWI",
      IndexKind::EqualWeighted => "EWI",
      IndexKind::CapWeighted => "CWI",
    }
  }
}

impl Display for IndexKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.label())
  }
}

/// Index level per date.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexSeries {
  kind: IndexKind,
  dates: Vec<NaiveDate>,
  levels: Array1<f64>,
}

impl IndexSeries {
  /// Seed at [`INDEX_BASE`] on `dates[0]` and compound one increment per later date.
  pub fn compounded(
    kind: IndexKind,
    dates: &[NaiveDate],
    increments: impl IntoIterator<Item = f64>,
  ) -> Result<Self> {
    let mut levels = Vec::with_capacity(dates.len());
    levels.push(INDEX_BASE);
    let mut level = INDEX_BASE;
    for x in increments {
      level *= 1.0 + x;
      levels.push(level);
    }

    if levels.len() != dates.len() {
      return Err(AnalyticsError::InvalidInput(format!(
        "{kind}: {} levels for {} dates",
        levels.len(),
        dates.len()
      )));
    }

    Ok(Self {
      kind,
      dates: dates.to_vec(),
      levels: Array1::from(levels),
    })
  }

  pub fn kind(&self) -> IndexKind {
    self.kind
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn levels(&self) -> &Array1<f64> {
    &self.levels
  }
}

/// `100 * sum_i P_t / sum_i P_0`.
pub fn price_weighted_index(prices: &PriceTable) -> Result<IndexSeries> {
  let sums = prices.values().sum_axis(Axis(1));
  let base = sums.first().copied().ok_or(AnalyticsError::InsufficientData {
    required: 1,
    actual: 0,
  })?;
  if !(base > 0.0) {
    return Err(AnalyticsError::domain("PWI base price sum", base));
  }

  Ok(IndexSeries {
    kind: IndexKind::PriceWeighted,
    dates: prices.dates().to_vec(),
    levels: sums / base * INDEX_BASE,
  })
}

/// Compounds the cross-sectional mean log return, as a simple increment.
pub fn equal_weighted_index(prices: &PriceTable, returns: &ReturnTable) -> Result<IndexSeries> {
  let means = returns
    .values()
    .mean_axis(Axis(1))
    .ok_or_else(|| AnalyticsError::InvalidInput("no assets".to_string()))?;
  IndexSeries::compounded(IndexKind::EqualWeighted, prices.dates(), means)
}

/// Compounds previous-date cap-weighted log returns, as a simple increment.
pub fn cap_weighted_index(
  prices: &PriceTable,
  returns: &ReturnTable,
  cap_weights: &Panel<f64>,
) -> Result<IndexSeries> {
  let increments = lagged_weighted_returns(returns, cap_weights)?;
  IndexSeries::compounded(IndexKind::CapWeighted, prices.dates(), increments)
}

/// Normalized prices, the three indices and the weight tables behind them.
#[derive(Clone, Debug)]
pub struct MarketIndices {
  /// Asset prices rebased to 100.
  pub normalized: PriceTable,
  pub pwi: IndexSeries,
  pub ewi: IndexSeries,
  pub cwi: IndexSeries,
  pub price_weights: Panel<f64>,
  pub equal_weights: Panel<f64>,
  /// Same-date cap weights; CWI applies them to the next date's returns.
  pub cap_weights: Panel<f64>,
}

impl MarketIndices {
  pub fn build(prices: &PriceTable, returns: &ReturnTable, caps: &MarketCapTable) -> Result<Self> {
    let normalized = normalized_prices(prices)?;
    let cap_w = cap_weights(caps)?;

    let indices = Self {
      pwi: price_weighted_index(prices)?,
      ewi: equal_weighted_index(prices, returns)?,
      cwi: cap_weighted_index(prices, returns, &cap_w)?,
      price_weights: price_weights(prices)?,
      equal_weights: equal_weights(prices)?,
      cap_weights: cap_w,
      normalized,
    };

    debug!(
      pwi = indices.pwi.levels()[indices.pwi.levels().len() - 1],
      ewi = indices.ewi.levels()[indices.ewi.levels().len() - 1],
      cwi = indices.cwi.levels()[indices.cwi.levels().len() - 1],
      "index levels on last date"
    );

    Ok(indices)
  }

  pub fn series(&self) -> [&IndexSeries; 3] {
    [&self.pwi, &self.ewi, &self.cwi]
  }

  /// Normalized asset prices with `PWI`, `EWI` and `CWI` appended.
  pub fn as_panel(&self) -> Result<PriceTable> {
    self.series().into_iter().try_fold(self.normalized.clone(), |panel, s| {
      panel.with_column(s.kind().label(), s.levels().clone())
    })
  }
}
