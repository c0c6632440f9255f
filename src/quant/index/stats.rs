//! # Annualized Statistics
//!
//! $$
//! \mu = 365.25\,\bar r,\qquad \sigma = \sqrt{365.25}\,\sqrt{\tfrac{1}{T-1}\sum_t (r_t-\bar r)^2}
//! $$
//!
//! Annualized return and risk of return series, sample covariance and
//! Pearson correlation of return tables.

use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use super::returns::log_returns;
use super::series::MarketIndices;
use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::market::ReturnTable;

/// Annualized mean and standard deviation of a return series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiskReturn {
  /// Annualized mean return.
  pub annual_return: f64,
  /// Annualized standard deviation of returns.
  pub risk: f64,
}

/// Named [`RiskReturn`] rows, in column order of the source table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskReturnTable {
  pub rows: Vec<(String, RiskReturn)>,
}

impl RiskReturnTable {
  pub fn get(&self, name: &str) -> Option<&RiskReturn> {
    self.rows.iter().find(|(n, _)| n == name).map(|(_, r)| r)
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

fn require_rows(actual: usize) -> Result<()> {
  if actual < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      actual,
    });
  }
  Ok(())
}

/// Mean times `periods_per_year`, sample std (ddof 1) times its square root.
pub fn annualized_risk_return(returns: ArrayView1<'_, f64>, periods_per_year: f64) -> Result<RiskReturn> {
  require_rows(returns.len())?;
  let mean = returns.mean().unwrap_or(0.0);
  let std = returns.std(1.0);

  Ok(RiskReturn {
    annual_return: mean * periods_per_year,
    risk: std * periods_per_year.sqrt(),
  })
}

/// [`annualized_risk_return`] for every column.
pub fn annualized_table(returns: &ReturnTable, periods_per_year: f64) -> Result<RiskReturnTable> {
  require_rows(returns.n_rows())?;
  let means = returns.values().mean_axis(Axis(0)).ok_or(AnalyticsError::InsufficientData {
    required: 2,
    actual: 0,
  })?;
  let stds = returns.values().std_axis(Axis(0), 1.0);

  Ok(RiskReturnTable {
    rows: returns
      .columns()
      .iter()
      .zip(means.iter().zip(stds.iter()))
      .map(|(name, (&m, &s))| {
        (
          name.clone(),
          RiskReturn {
            annual_return: m * periods_per_year,
            risk: s * periods_per_year.sqrt(),
          },
        )
      })
      .collect(),
  })
}

/// Annualized risk and return of each normalized asset column and of
/// `PWI`, `EWI`, `CWI`, from their own log returns.
///
/// A non-positive index level is a [`AnalyticsError::NumericDomain`].
pub fn stats_index(indices: &MarketIndices, periods_per_year: f64) -> Result<RiskReturnTable> {
  let levels = indices.as_panel()?;
  let returns = log_returns(&levels)?;
  annualized_table(&returns, periods_per_year)
}

/// Sample covariance (ddof 1) of the columns, scaled by `periods_per_year`.
pub fn covariance_matrix(returns: &ReturnTable, periods_per_year: f64) -> Result<Array2<f64>> {
  require_rows(returns.n_rows())?;
  let cov = returns
    .values()
    .t()
    .cov(1.0)
    .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))?;
  Ok(cov * periods_per_year)
}

/// Pearson correlation of the columns. Constant columns have no correlation
/// and raise [`AnalyticsError::NumericDomain`].
pub fn correlation_matrix(returns: &ReturnTable) -> Result<Array2<f64>> {
  require_rows(returns.n_rows())?;
  let stds = returns.values().std_axis(Axis(0), 1.0);
  for (name, &s) in returns.columns().iter().zip(stds.iter()) {
    if !(s > 0.0) {
      return Err(AnalyticsError::domain(
        format!("correlation of constant series {name}"),
        s,
      ));
    }
  }

  returns
    .values()
    .t()
    .pearson_correlation()
    .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))
}
