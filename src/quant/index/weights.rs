//! # Index Weights
//!
//! $$
//! w^{PWI}_{i,t} = \frac{P_{i,t}}{\sum_j P_{j,t}},\qquad
//! w^{EWI}_{i,t} = \frac1n,\qquad
//! w^{CWI}_{i,t} = \frac{\text{cap}_{i,t}}{\sum_j \text{cap}_{j,t}}
//! $$
//!
//! Per-date weights of the three index schemes. Every row sums to one.

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::market::MarketCapTable;
use crate::quant::market::Panel;
use crate::quant::market::PriceTable;
use crate::quant::market::ReturnTable;

fn row_normalized(
  dates: &[NaiveDate],
  columns: &[String],
  mut values: Array2<f64>,
  label: &str,
) -> Result<Panel<f64>> {
  for (mut row, date) in values.rows_mut().into_iter().zip(dates) {
    let total: f64 = row.sum();
    if !(total > 0.0) {
      return Err(AnalyticsError::domain(
        format!("{label} weight denominator on {date}"),
        total,
      ));
    }
    row /= total;
  }

  Panel::new(dates.to_vec(), columns.to_vec(), values)
}

/// Price-weighted index weights, recomputed from each date's prices.
pub fn price_weights(prices: &PriceTable) -> Result<Panel<f64>> {
  row_normalized(
    prices.dates(),
    prices.columns(),
    prices.values().clone(),
    "price",
  )
}

/// Equal weights `1/n` on every date.
pub fn equal_weights(prices: &PriceTable) -> Result<Panel<f64>> {
  let n = prices.n_cols();
  if n == 0 {
    return Err(AnalyticsError::InvalidInput("no assets".to_string()));
  }

  Panel::new(
    prices.dates().to_vec(),
    prices.columns().to_vec(),
    Array2::from_elem((prices.n_rows(), n), 1.0 / n as f64),
  )
}

/// Capitalization weights, recomputed from each date's market caps.
pub fn cap_weights(caps: &MarketCapTable) -> Result<Panel<f64>> {
  row_normalized(
    caps.dates(),
    caps.columns(),
    caps.values().mapv(|c| c as f64),
    "market cap",
  )
}

/// Weighted return series with weights lagged by one date:
/// `x_t = sum_i w_{i,t-1} r_{i,t}`.
///
/// `weights` lives on the price calendar, one row longer than `returns`.
/// Columns of `weights` must exist in `returns`; return columns without a
/// weight contribute nothing.
pub fn lagged_weighted_returns(returns: &ReturnTable, weights: &Panel<f64>) -> Result<Array1<f64>> {
  if weights.n_rows() != returns.n_rows() + 1 || weights.dates()[1..] != *returns.dates() {
    return Err(AnalyticsError::InvalidInput(
      "weights must cover the return calendar plus one leading date".to_string(),
    ));
  }

  let idx = weights
    .columns()
    .iter()
    .map(|c| {
      returns
        .column_index(c)
        .ok_or_else(|| AnalyticsError::UnknownColumn(c.clone()))
    })
    .collect::<Result<Vec<_>>>()?;

  let r = returns.values();
  let w = weights.values();
  Ok(Array1::from_shape_fn(returns.n_rows(), |t| {
    idx
      .iter()
      .enumerate()
      .map(|(k, &j)| w[[t, k]] * r[[t, j]])
      .sum()
  }))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;
  use crate::quant::index::log_returns;

  fn table<T: Clone>(values: Array2<T>, columns: &[&str]) -> Panel<T> {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    Panel::new(
      start.iter_days().take(values.nrows()).collect(),
      columns.iter().map(|c| c.to_string()).collect(),
      values,
    )
    .unwrap()
  }

  fn assert_rows_sum_to_one(p: &Panel<f64>) {
    for row in p.values().rows() {
      assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
      assert!(row.iter().all(|&w| w >= 0.0));
    }
  }

  #[test]
  fn all_schemes_sum_to_one_every_date() {
    let prices = table(
      array![[42000.0, 2300.0, 310.0], [43100.5, 2250.0, 305.2], [41800.0, 2400.1, 299.9]],
      &["BTC", "ETH", "BNB"],
    );
    let caps = table(
      array![
        [820_000_000_000i64, 276_000_000_000, 48_000_000_000],
        [840_000_000_000, 270_000_000_000, 47_000_000_000],
        [815_000_000_000, 288_000_000_000, 46_500_000_000]
      ],
      &["BTC", "ETH", "BNB"],
    );

    assert_rows_sum_to_one(&price_weights(&prices).unwrap());
    assert_rows_sum_to_one(&equal_weights(&prices).unwrap());
    assert_rows_sum_to_one(&cap_weights(&caps).unwrap());
  }

  #[test]
  fn zero_total_cap_is_a_domain_error() {
    let caps = table(array![[0i64, 0], [1, 1]], &["A", "B"]);
    assert!(matches!(
      cap_weights(&caps),
      Err(AnalyticsError::NumericDomain { .. })
    ));
  }

  #[test]
  fn weights_lag_returns_by_one_date() {
    let prices = table(array![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0]], &["A", "B"]);
    let returns = log_returns(&prices).unwrap();
    let weights = table(array![[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]], &["A", "B"]);

    let x = lagged_weighted_returns(&returns, &weights).unwrap();
    // Day 1 uses day-0 weights (all A), day 2 uses day-1 weights (all B).
    assert_abs_diff_eq!(x[0], 2f64.ln(), epsilon = 1e-12);
    assert_abs_diff_eq!(x[1], 2f64.ln(), epsilon = 1e-12);
  }

  #[test]
  fn unweighted_return_columns_are_ignored() {
    let prices = table(array![[1.0, 1.0], [2.0, 4.0]], &["A", "B"]);
    let returns = log_returns(&prices).unwrap();
    let weights = table(array![[1.0], [1.0]], &["A"]);

    let x = lagged_weighted_returns(&returns, &weights).unwrap();
    assert_abs_diff_eq!(x[0], 2f64.ln(), epsilon = 1e-12);
  }

  #[test]
  fn misaligned_weights_are_rejected() {
    let prices = table(array![[1.0], [2.0], [3.0]], &["A"]);
    let returns = log_returns(&prices).unwrap();
    let weights = table(array![[1.0], [1.0]], &["A"]);
    assert!(lagged_weighted_returns(&returns, &weights).is_err());
  }
}
