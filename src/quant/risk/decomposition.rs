//! # CAPM Decomposition
//!
//! $$
//! \beta_i = \frac{\operatorname{Cov}(r_i, r_b)}{\operatorname{Var}(r_b)},\qquad
//! \text{CAPM}_i = r_f + (\mu_b - r_f)\,\beta_i,\qquad
//! \alpha_i = \mu_i - \text{CAPM}_i
//! $$
//!
//! Per-asset Sharpe ratio, variance split and CAPM figures against one
//! benchmark column of a return table.

use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::index::annualized_table;
use crate::quant::index::covariance_matrix;
use crate::quant::index::lagged_weighted_returns;
use crate::quant::index::RiskReturn;
use crate::quant::market::Panel;
use crate::quant::market::ReturnTable;

/// Column label of the market-cap weighted benchmark.
pub const MARKET_CAP_COLUMN: &str = "MCAP";

/// Risk below this fraction of the annual return's magnitude is rounding noise.
const RISKLESS_TOL: f64 = 1e-10;

/// Zero, NaN, or only rounding noise left over from a constant series.
fn is_riskless(rr: &RiskReturn) -> bool {
  !(rr.risk > RISKLESS_TOL * rr.annual_return.abs())
}

/// Statistics of one column against the benchmark.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AssetStatistics {
  /// Annualized mean return.
  pub annual_return: f64,
  /// Annualized standard deviation.
  pub risk: f64,
  pub sharpe: f64,
  /// `risk^2`.
  pub variance: f64,
  /// Annualized covariance with the benchmark.
  pub systematic_variance: f64,
  /// `variance - systematic_variance`.
  pub unsystematic_variance: f64,
  pub beta: f64,
  /// CAPM expected return.
  pub capm: f64,
  pub alpha: f64,
}

/// Decomposition of every column of a return table against one of them.
#[derive(Clone, Debug)]
pub struct StatisticsTable {
  benchmark: String,
  rows: Vec<(String, AssetStatistics)>,
  covariance: Array2<f64>,
}

impl StatisticsTable {
  pub fn benchmark(&self) -> &str {
    &self.benchmark
  }

  /// Rows in column order, benchmark included.
  pub fn rows(&self) -> &[(String, AssetStatistics)] {
    &self.rows
  }

  pub fn get(&self, name: &str) -> Option<&AssetStatistics> {
    self.rows.iter().find(|(n, _)| n == name).map(|(_, s)| s)
  }

  /// Annualized covariance matrix, rows and columns in row order.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

/// Decompose every column of `returns` against the `benchmark` column.
///
/// Zero risk of any column, or zero benchmark variance, raises
/// [`AnalyticsError::NumericDomain`]. The benchmark's own beta is exactly 1.
pub fn decompose(
  returns: &ReturnTable,
  benchmark: &str,
  risk_free: f64,
  periods_per_year: f64,
) -> Result<StatisticsTable> {
  let b = returns
    .column_index(benchmark)
    .ok_or_else(|| AnalyticsError::UnknownColumn(benchmark.to_string()))?;
  let table = annualized_table(returns, periods_per_year)?;
  let covariance = covariance_matrix(returns, periods_per_year)?;

  let benchmark_var = covariance[[b, b]];
  if !(benchmark_var > 0.0) || is_riskless(&table.rows[b].1) {
    return Err(AnalyticsError::domain(
      format!("systematic variance of benchmark {benchmark}"),
      benchmark_var,
    ));
  }
  let benchmark_return = table.rows[b].1.annual_return;

  let rows = table
    .rows
    .iter()
    .enumerate()
    .map(|(j, (name, rr))| {
      if is_riskless(rr) {
        return Err(AnalyticsError::domain(format!("Sharpe ratio of {name}"), rr.risk));
      }
      let variance = rr.risk * rr.risk;
      let systematic_variance = covariance[[j, b]];
      let beta = if j == b {
        1.0
      } else {
        systematic_variance / benchmark_var
      };
      let capm = risk_free + (benchmark_return - risk_free) * beta;

      Ok((
        name.clone(),
        AssetStatistics {
          annual_return: rr.annual_return,
          risk: rr.risk,
          sharpe: (rr.annual_return - risk_free) / rr.risk,
          variance,
          systematic_variance,
          unsystematic_variance: variance - systematic_variance,
          beta,
          capm,
          alpha: rr.annual_return - capm,
        },
      ))
    })
    .collect::<Result<Vec<_>>>()?;

  debug!(benchmark, rows = rows.len(), "risk decomposition");

  Ok(StatisticsTable {
    benchmark: benchmark.to_string(),
    rows,
    covariance,
  })
}

/// Market-cap weighted return series, previous-date cap weights applied to
/// each date's returns. Not compounded.
pub fn market_cap_returns(returns: &ReturnTable, cap_weights: &Panel<f64>) -> Result<Array1<f64>> {
  lagged_weighted_returns(returns, cap_weights)
}

/// `returns` with the [`MARKET_CAP_COLUMN`] series appended.
pub fn with_market_cap_column(returns: &ReturnTable, cap_weights: &Panel<f64>) -> Result<ReturnTable> {
  returns.with_column(MARKET_CAP_COLUMN, market_cap_returns(returns, cap_weights)?)
}
