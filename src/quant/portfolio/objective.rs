//! # Sharpe Objective
//!
//! $$
//! f(\mathbf w) = \frac{r_f - A\,\bar{\mathbf r}^\top\mathbf w}{\sqrt{A\,\mathbf w^\top S\,\mathbf w}},\qquad
//! \nabla f = -\frac{A\bar{\mathbf r}}{\sigma} - (r_f - \mu_p)\frac{A S\mathbf w}{\sigma^3}
//! $$
//!
//! Negated Sharpe ratio of a fixed-weight portfolio over a return table,
//! with its analytic gradient. `A` is the annualization factor and `S` the
//! sample covariance (ddof 1) of daily returns, so `sigma` equals the
//! annualized standard deviation of `returns . w`.

use argmin::core::CostFunction;
use argmin::core::Gradient;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::quant::market::ReturnTable;

/// Negated Sharpe ratio as an argmin problem over `Vec<f64>` weights.
#[derive(Clone, Debug)]
pub struct SharpeObjective {
  mean: Array1<f64>,
  cov: Array2<f64>,
  risk_free: f64,
  periods_per_year: f64,
}

impl SharpeObjective {
  pub fn new(returns: &ReturnTable, risk_free: f64, periods_per_year: f64) -> Result<Self> {
    if returns.n_rows() < 2 {
      return Err(AnalyticsError::InsufficientData {
        required: 2,
        actual: returns.n_rows(),
      });
    }
    if returns.n_cols() == 0 {
      return Err(AnalyticsError::InvalidInput("no assets to optimize".to_string()));
    }

    let mean = returns
      .values()
      .mean_axis(Axis(0))
      .ok_or_else(|| AnalyticsError::InvalidInput("empty return table".to_string()))?;
    let cov = returns
      .values()
      .t()
      .cov(1.0)
      .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))?;

    Ok(Self {
      mean,
      cov,
      risk_free,
      periods_per_year,
    })
  }

  pub fn n_assets(&self) -> usize {
    self.mean.len()
  }

  fn check_len(&self, w: &[f64]) -> Result<()> {
    if w.len() != self.n_assets() {
      return Err(AnalyticsError::InvalidInput(format!(
        "{} weights for {} assets",
        w.len(),
        self.n_assets()
      )));
    }
    Ok(())
  }

  /// Annualized mean of `returns . w`.
  pub fn portfolio_return(&self, w: &[f64]) -> f64 {
    self.mean.iter().zip(w).map(|(m, w)| m * w).sum::<f64>() * self.periods_per_year
  }

  /// Annualized standard deviation of `returns . w`. Zero risk is a domain error.
  pub fn portfolio_risk(&self, w: &[f64]) -> Result<f64> {
    let w = Array1::from(w.to_vec());
    let var = w.dot(&self.cov.dot(&w)) * self.periods_per_year;
    if !(var > 0.0) {
      return Err(AnalyticsError::domain("portfolio risk", var.max(0.0).sqrt()));
    }
    Ok(var.sqrt())
  }

  /// `(risk_free - return) / risk`, the quantity being minimized.
  pub fn negated_sharpe(&self, w: &[f64]) -> Result<f64> {
    self.check_len(w)?;
    let risk = self.portfolio_risk(w)?;
    Ok((self.risk_free - self.portfolio_return(w)) / risk)
  }

  pub fn negated_sharpe_gradient(&self, w: &[f64]) -> Result<Vec<f64>> {
    self.check_len(w)?;
    let a = self.periods_per_year;
    let sigma = self.portfolio_risk(w)?;
    let excess = self.risk_free - self.portfolio_return(w);
    let sw = self.cov.dot(&Array1::from(w.to_vec()));

    Ok(
      self
        .mean
        .iter()
        .zip(sw.iter())
        .map(|(&m, &s)| -a * m / sigma - excess * a * s / sigma.powi(3))
        .collect(),
    )
  }
}

impl CostFunction for SharpeObjective {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    Ok(self.negated_sharpe(x)?)
  }
}

impl Gradient for SharpeObjective {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> std::result::Result<Self::Gradient, argmin::core::Error> {
    Ok(self.negated_sharpe_gradient(x)?)
  }
}
