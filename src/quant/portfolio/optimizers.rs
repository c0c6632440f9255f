//! # Tangency Optimizer
//!
//! $$
//! \mathbf w^\* = \arg\min_{\mathbf w}\ \frac{r_f - \mu_p(\mathbf w)}{\sigma_p(\mathbf w)}
//! \quad\text{s.t.}\quad \mathbf 1^\top\mathbf w = 1,\ \ 0\le w_i\le 1
//! $$
//!
//! Long-only, fully invested Sharpe maximization started from equal weights,
//! and the tangency portfolio (`TP`) return series derived from it.

use ndarray::Array1;
use tracing::info;

use super::objective::SharpeObjective;
use super::slsqp::LinearConstraints;
use super::slsqp::Slsqp;
use super::types::OptimalWeights;
use super::types::SolverConfig;
use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::market::ReturnTable;

/// Column label of the tangency portfolio's return series.
pub const TANGENCY_COLUMN: &str = "TP";

/// Solve for the tangency portfolio of every column in `returns`.
///
/// `returns` must hold asset columns only, derived benchmark columns would
/// otherwise be optimized over as well.
pub fn optimize_tangency(
  returns: &ReturnTable,
  risk_free: f64,
  periods_per_year: f64,
  config: &SolverConfig,
) -> Result<OptimalWeights> {
  let objective = SharpeObjective::new(returns, risk_free, periods_per_year)?;
  let n = objective.n_assets();
  let x0 = vec![1.0 / n as f64; n];

  let report = Slsqp::new(*config).minimize(&objective, x0, &LinearConstraints::simplex(n))?;

  let expected_return = objective.portfolio_return(&report.x);
  let volatility = objective.portfolio_risk(&report.x)?;
  let weights = Array1::from(report.x);

  info!(
    iterations = report.iterations,
    sharpe = -report.cost,
    expected_return,
    volatility,
    "tangency portfolio solved"
  );

  Ok(OptimalWeights {
    assets: returns.columns().to_vec(),
    weights,
    expected_return,
    volatility,
    sharpe: -report.cost,
    iterations: report.iterations,
  })
}

/// `returns . w` per date, matching weights to columns by symbol.
pub fn tangency_returns(returns: &ReturnTable, weights: &OptimalWeights) -> Result<Array1<f64>> {
  if weights.assets.len() != weights.weights.len() {
    return Err(AnalyticsError::InvalidInput(format!(
      "{} weights for {} assets",
      weights.weights.len(),
      weights.assets.len()
    )));
  }
  let assets = returns.select(&weights.assets)?;
  Ok(assets.values().dot(&weights.weights))
}

/// `returns` with the [`TANGENCY_COLUMN`] series appended.
pub fn with_tangency_column(returns: &ReturnTable, weights: &OptimalWeights) -> Result<ReturnTable> {
  returns.with_column(TANGENCY_COLUMN, tangency_returns(returns, weights)?)
}
