//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Solver configuration, solver reports and the optimizer's result container.

use ndarray::Array1;

/// Tuning of the SQP solver.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
  /// Outer iterations before failing with `OptimizationFailure`.
  pub max_iters: u64,
  /// Converged once an accepted step changes the objective by less than this.
  pub ftol: f64,
  /// Converged once the search direction is shorter than this (max norm).
  pub xtol: f64,
  /// Step halvings per line search.
  pub max_line_search: usize,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 200,
      ftol: 1e-9,
      xtol: 1e-10,
      max_line_search: 30,
    }
  }
}

/// Why the solver stopped successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
  /// Objective change fell below `ftol`.
  ObjectiveTolerance,
  /// Search direction fell below `xtol`.
  StepTolerance,
  /// No descent direction left at the current point.
  Stationary,
}

/// Final state of a converged solve.
#[derive(Clone, Debug)]
pub struct SolverReport {
  pub x: Vec<f64>,
  pub cost: f64,
  pub iterations: u64,
  pub termination: Termination,
}

/// Tangency portfolio: Sharpe-optimal long-only, fully invested weights.
#[derive(Clone, Debug)]
pub struct OptimalWeights {
  /// Asset symbols, in weight order.
  pub assets: Vec<String>,
  pub weights: Array1<f64>,
  /// Annualized expected return of the weighted portfolio.
  pub expected_return: f64,
  /// Annualized volatility of the weighted portfolio.
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
  /// Solver iterations used.
  pub iterations: u64,
}

impl OptimalWeights {
  /// Weight of `asset`, if present.
  pub fn weight(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.weights[i])
  }
}
