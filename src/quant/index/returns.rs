//! # Returns
//!
//! $$
//! r_{i,t} = \ln\frac{P_{i,t}}{P_{i,t-1}}
//! $$
//!
//! Period returns and price normalization. Any non-positive price is a
//! [`AnalyticsError::NumericDomain`].

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::market::Panel;
use crate::quant::market::PriceTable;
use crate::quant::market::ReturnTable;

pub(crate) fn log_ratio(prev: f64, next: f64, context: impl FnOnce() -> String) -> Result<f64> {
  if !(prev > 0.0) {
    return Err(AnalyticsError::domain(context(), prev));
  }
  if !(next > 0.0) {
    return Err(AnalyticsError::domain(context(), next));
  }
  Ok((next / prev).ln())
}

fn period_returns(
  prices: &Panel<f64>,
  label: &str,
  f: impl Fn(f64, f64, &dyn Fn() -> String) -> Result<f64>,
) -> Result<ReturnTable> {
  let n = prices.n_rows();
  if n < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      actual: n,
    });
  }

  let v = prices.values();
  let mut out = Array2::<f64>::zeros((n - 1, prices.n_cols()));
  for t in 1..n {
    for (j, name) in prices.columns().iter().enumerate() {
      let date = prices.dates()[t];
      out[[t - 1, j]] = f(v[[t - 1, j]], v[[t, j]], &|| {
        format!("{label} of {name} on {date}")
      })?;
    }
  }

  Panel::new(prices.dates()[1..].to_vec(), prices.columns().to_vec(), out)
}

/// Daily log returns. One row fewer than `prices`.
pub fn log_returns(prices: &Panel<f64>) -> Result<ReturnTable> {
  period_returns(prices, "log return", |prev, next, ctx| {
    log_ratio(prev, next, ctx)
  })
}

/// Daily arithmetic returns `P_t / P_{t-1} - 1`.
pub fn simple_returns(prices: &Panel<f64>) -> Result<ReturnTable> {
  period_returns(prices, "simple return", |prev, next, ctx| {
    if !(prev > 0.0) {
      return Err(AnalyticsError::domain(ctx(), prev));
    }
    Ok(next / prev - 1.0)
  })
}

/// Prices rebased to 100 at the first date.
pub fn normalized_prices(prices: &PriceTable) -> Result<PriceTable> {
  let first = prices
    .values()
    .rows()
    .into_iter()
    .next()
    .ok_or(AnalyticsError::InsufficientData {
      required: 1,
      actual: 0,
    })?;

  for (name, &p0) in prices.columns().iter().zip(first.iter()) {
    if !(p0 > 0.0) {
      return Err(AnalyticsError::domain(
        format!("normalization base of {name}"),
        p0,
      ));
    }
  }

  let values = prices.values() / &first.insert_axis(Axis(0)) * 100.0;
  Panel::new(prices.dates().to_vec(), prices.columns().to_vec(), values)
}

/// Mean daily return per column, not annualized.
pub fn mean_returns(returns: &ReturnTable) -> Result<Array1<f64>> {
  returns
    .values()
    .mean_axis(Axis(0))
    .ok_or(AnalyticsError::InsufficientData {
      required: 1,
      actual: 0,
    })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;
  use ndarray::array;

  use super::*;

  fn prices(values: Array2<f64>) -> PriceTable {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let dates = start.iter_days().take(values.nrows()).collect();
    let columns = (0..values.ncols()).map(|j| format!("A{j}")).collect();
    Panel::new(dates, columns, values).unwrap()
  }

  #[test]
  fn log_returns_drop_first_row() {
    let p = prices(array![[100.0, 50.0], [110.0, 55.0], [121.0, 60.5]]);
    let r = log_returns(&p).unwrap();

    assert_eq!(r.n_rows(), 2);
    assert_eq!(r.dates(), &p.dates()[1..]);
    for v in r.values().iter() {
      assert_abs_diff_eq!(*v, 1.1f64.ln(), epsilon = 1e-12);
    }
  }

  #[test]
  fn exp_of_log_return_recovers_simple_return() {
    let p = prices(array![[100.0, 20.0], [100.4, 19.9], [100.1, 20.05], [101.0, 20.0]]);
    let log = log_returns(&p).unwrap();
    let simple = simple_returns(&p).unwrap();

    for (l, s) in log.values().iter().zip(simple.values().iter()) {
      assert_abs_diff_eq!(l.exp() - 1.0, *s, epsilon = 1e-6);
    }
  }

  #[test]
  fn non_positive_price_is_a_domain_error() {
    let p = prices(array![[100.0], [0.0], [10.0]]);
    let err = log_returns(&p).unwrap_err();
    match err {
      AnalyticsError::NumericDomain { context, value } => {
        assert!(context.contains("A0"));
        assert_eq!(value, 0.0);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn normalized_prices_start_at_100() {
    let p = prices(array![[4.0, 200.0], [5.0, 100.0]]);
    let n = normalized_prices(&p).unwrap();
    assert_eq!(n.values().row(0).to_vec(), vec![100.0, 100.0]);
    assert_abs_diff_eq!(n.values()[[1, 0]], 125.0, epsilon = 1e-12);
    assert_abs_diff_eq!(n.values()[[1, 1]], 50.0, epsilon = 1e-12);
  }

  #[test]
  fn normalization_needs_positive_base() {
    let p = prices(array![[0.0], [1.0]]);
    assert!(matches!(
      normalized_prices(&p),
      Err(AnalyticsError::NumericDomain { .. })
    ));
  }

  #[test]
  fn mean_returns_per_column() {
    let p = prices(array![[1.0, 1.0], [2.0, 1.0], [4.0, 1.0]]);
    let m = mean_returns(&log_returns(&p).unwrap()).unwrap();
    assert_abs_diff_eq!(m[0], 2f64.ln(), epsilon = 1e-12);
    assert_abs_diff_eq!(m[1], 0.0, epsilon = 1e-12);
  }
}
