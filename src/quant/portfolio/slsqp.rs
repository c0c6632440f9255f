//! # Sequential Quadratic Programming
//!
//! $$
//! \min_{\mathbf d}\ \tfrac12\mathbf d^\top B_k\mathbf d + \nabla f(\mathbf x_k)^\top\mathbf d
//! \quad\text{s.t.}\quad \mathbf a^\top\mathbf d = 0,\ \ \mathbf l \le \mathbf x_k+\mathbf d \le \mathbf u
//! $$
//!
//! SLSQP-style solver for smooth objectives under per-variable bounds and one
//! linear equality. Each iteration solves the quadratic subproblem above with
//! a primal active-set method, backtracks along the resulting direction and
//! updates `B` with a damped BFGS step. Iterates stay feasible throughout.
//!
//! Problems plug in through argmin's [`CostFunction`] and [`Gradient`] traits.

use argmin::core::CostFunction;
use argmin::core::Gradient;
use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;
use tracing::info;

use super::types::SolverConfig;
use super::types::SolverReport;
use super::types::Termination;
use crate::error::AnalyticsError;
use crate::error::Result;

const FEASIBILITY_TOL: f64 = 1e-9;
const ARMIJO_C1: f64 = 1e-4;
const PIVOT_TOL: f64 = 1e-14;

/// Box bounds plus the single equality `eq_coeffs . x = eq_rhs`.
#[derive(Clone, Debug)]
pub struct LinearConstraints {
  pub lower: Vec<f64>,
  pub upper: Vec<f64>,
  pub eq_coeffs: Vec<f64>,
  pub eq_rhs: f64,
}

impl LinearConstraints {
  /// `0 <= x_i <= 1`, `sum x = 1`.
  pub fn simplex(n: usize) -> Self {
    Self {
      lower: vec![0.0; n],
      upper: vec![1.0; n],
      eq_coeffs: vec![1.0; n],
      eq_rhs: 1.0,
    }
  }

  pub fn n(&self) -> usize {
    self.lower.len()
  }

  fn validate(&self) -> Result<()> {
    let n = self.n();
    if n == 0 || self.upper.len() != n || self.eq_coeffs.len() != n {
      return Err(AnalyticsError::InvalidInput(
        "constraint vectors must be non-empty and of equal length".to_string(),
      ));
    }
    if self.lower.iter().zip(&self.upper).any(|(l, u)| !(l <= u)) {
      return Err(AnalyticsError::InvalidInput(
        "lower bound above upper bound".to_string(),
      ));
    }
    if self.eq_coeffs.iter().all(|&a| a == 0.0) {
      return Err(AnalyticsError::InvalidInput(
        "equality constraint has no non-zero coefficient".to_string(),
      ));
    }
    Ok(())
  }

  /// Whether `x` satisfies bounds and equality within `tol`.
  pub fn is_feasible(&self, x: &[f64], tol: f64) -> bool {
    x.len() == self.n()
      && x
        .iter()
        .zip(self.lower.iter().zip(&self.upper))
        .all(|(&xi, (&l, &u))| xi >= l - tol && xi <= u + tol)
      && (dot(&self.eq_coeffs, x) - self.eq_rhs).abs() <= tol
  }

  fn clamp(&self, x: &mut [f64]) {
    for (xi, (&l, &u)) in x.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
      *xi = xi.clamp(l, u);
    }
  }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
  Lower,
  Upper,
}

/// Active-set solve of `min 0.5 d'Bd + g'd` s.t. `a'd = 0`, `lo <= d <= hi`,
/// where `lo <= 0 <= hi` so that `d = 0` is feasible.
fn solve_qp(
  b: &DMatrix<f64>,
  g: &DVector<f64>,
  a: &DVector<f64>,
  lo: &[f64],
  hi: &[f64],
) -> Result<DVector<f64>> {
  let n = g.len();
  let mut d = DVector::<f64>::zeros(n);
  let mut working: Vec<Option<Bound>> = vec![None; n];

  // Start with the bounds that are already tight, keeping at least one free
  // variable that carries the equality.
  let mut free_eq = a.iter().filter(|&&ai| ai != 0.0).count();
  for i in 0..n {
    let bound = if lo[i] >= 0.0 {
      Some(Bound::Lower)
    } else if hi[i] <= 0.0 {
      Some(Bound::Upper)
    } else {
      None
    };
    if let Some(bound) = bound {
      if a[i] != 0.0 {
        if free_eq == 1 {
          continue;
        }
        free_eq -= 1;
      }
      working[i] = Some(bound);
    }
  }

  let max_iter = 50 * (n + 1);
  for _ in 0..max_iter {
    let free: Vec<usize> = (0..n).filter(|&i| working[i].is_none()).collect();
    let q = g + b * &d;
    let m = free.len();

    let mut kkt = DMatrix::<f64>::zeros(m + 1, m + 1);
    let mut rhs = DVector::<f64>::zeros(m + 1);
    for (r, &i) in free.iter().enumerate() {
      for (c, &j) in free.iter().enumerate() {
        kkt[(r, c)] = b[(i, j)];
      }
      kkt[(r, m)] = a[i];
      kkt[(m, r)] = a[i];
      rhs[r] = -q[i];
    }

    let sol = kkt.lu().solve(&rhs).ok_or_else(|| AnalyticsError::OptimizationFailure {
      iterations: 0,
      reason: "singular quadratic subproblem".to_string(),
    })?;
    let nu = sol[m];
    let p_norm = (0..m).map(|k| sol[k].abs()).fold(0.0, f64::max);

    if p_norm <= 1e-12 * (1.0 + d.amax()) {
      let mut worst: Option<(usize, f64)> = None;
      for i in 0..n {
        let Some(bound) = working[i] else {
          continue;
        };
        let grad = q[i] + nu * a[i];
        let mu = match bound {
          Bound::Lower => grad,
          Bound::Upper => -grad,
        };
        if mu < -1e-12 && worst.map_or(true, |(_, w)| mu < w) {
          worst = Some((i, mu));
        }
      }

      match worst {
        None => return Ok(d),
        Some((i, _)) => working[i] = None,
      }
      continue;
    }

    let mut alpha = 1.0;
    let mut blocking: Option<(usize, Bound)> = None;
    for (k, &i) in free.iter().enumerate() {
      let p = sol[k];
      if p < -PIVOT_TOL {
        let ratio = (lo[i] - d[i]) / p;
        if ratio < alpha {
          alpha = ratio;
          blocking = Some((i, Bound::Lower));
        }
      } else if p > PIVOT_TOL {
        let ratio = (hi[i] - d[i]) / p;
        if ratio < alpha {
          alpha = ratio;
          blocking = Some((i, Bound::Upper));
        }
      }
    }

    let alpha = alpha.max(0.0);
    for (k, &i) in free.iter().enumerate() {
      d[i] += alpha * sol[k];
    }
    if let Some((i, bound)) = blocking {
      d[i] = match bound {
        Bound::Lower => lo[i],
        Bound::Upper => hi[i],
      };
      working[i] = Some(bound);
    }
  }

  Err(AnalyticsError::OptimizationFailure {
    iterations: 0,
    reason: "quadratic subproblem did not converge".to_string(),
  })
}

/// Powell-damped BFGS update, keeps `b` positive definite.
fn damped_bfgs(b: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
  let bs = &*b * s;
  let sbs = s.dot(&bs);
  if !(sbs > 1e-300) {
    return;
  }

  let sy = s.dot(y);
  let theta = if sy >= 0.2 * sbs {
    1.0
  } else {
    0.8 * sbs / (sbs - sy)
  };
  let r = y * theta + &bs * (1.0 - theta);
  let sr = s.dot(&r);
  if !(sr > 1e-300) {
    return;
  }

  *b -= &bs * bs.transpose() / sbs;
  *b += &r * r.transpose() / sr;
}

/// SLSQP-class minimizer for bound and single-equality constrained problems.
#[derive(Clone, Debug, Default)]
pub struct Slsqp {
  config: SolverConfig,
}

impl Slsqp {
  pub fn new(config: SolverConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &SolverConfig {
    &self.config
  }

  /// Minimize `problem` from the feasible start `x0`.
  ///
  /// Fails with [`AnalyticsError::OptimizationFailure`] when the iteration cap
  /// is hit or no descent step can be found; the last iterate is never
  /// returned as a result.
  pub fn minimize<P>(
    &self,
    problem: &P,
    x0: Vec<f64>,
    constraints: &LinearConstraints,
  ) -> Result<SolverReport>
  where
    P: CostFunction<Param = Vec<f64>, Output = f64>
      + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
  {
    constraints.validate()?;
    if !constraints.is_feasible(&x0, FEASIBILITY_TOL) {
      return Err(AnalyticsError::InvalidInput(format!(
        "start point {x0:?} violates the constraints"
      )));
    }

    let n = x0.len();
    let a = DVector::from_column_slice(&constraints.eq_coeffs);
    let mut x = x0;
    let mut f = problem
      .cost(&x)
      .map_err(|e| AnalyticsError::from_argmin(e, 0))?;
    let mut g = DVector::from_vec(
      problem
        .gradient(&x)
        .map_err(|e| AnalyticsError::from_argmin(e, 0))?,
    );
    if !f.is_finite() || g.iter().any(|v| !v.is_finite()) {
      return Err(AnalyticsError::domain("objective at start point", f));
    }

    let mut b = DMatrix::<f64>::identity(n, n);
    let mut hessian_reset = false;

    for iter in 1..=self.config.max_iters {
      let lo: Vec<f64> = constraints.lower.iter().zip(&x).map(|(l, xi)| (l - xi).min(0.0)).collect();
      let hi: Vec<f64> = constraints.upper.iter().zip(&x).map(|(u, xi)| (u - xi).max(0.0)).collect();
      let d = solve_qp(&b, &g, &a, &lo, &hi).map_err(|e| match e {
        AnalyticsError::OptimizationFailure { reason, .. } => AnalyticsError::OptimizationFailure {
          iterations: iter,
          reason,
        },
        other => other,
      })?;

      if d.amax() < self.config.xtol {
        return Ok(self.finish(x, f, iter, Termination::StepTolerance));
      }

      let slope = g.dot(&d);
      let Some((x_new, f_new)) = self.line_search(problem, &x, &d, f, slope, constraints) else {
        if slope > -self.config.ftol {
          return Ok(self.finish(x, f, iter, Termination::Stationary));
        }
        if !hessian_reset {
          debug!(iter, "line search failed, resetting Hessian approximation");
          b = DMatrix::identity(n, n);
          hessian_reset = true;
          continue;
        }
        return Err(AnalyticsError::OptimizationFailure {
          iterations: iter,
          reason: "line search found no decrease along a descent direction".to_string(),
        });
      };
      hessian_reset = false;

      let g_new = DVector::from_vec(
        problem
          .gradient(&x_new)
          .map_err(|e| AnalyticsError::from_argmin(e, iter))?,
      );
      let s = DVector::from_iterator(n, x_new.iter().zip(&x).map(|(xn, xo)| xn - xo));
      let y = &g_new - &g;
      damped_bfgs(&mut b, &s, &y);

      let df = (f - f_new).abs();
      debug!(iter, cost = f_new, step = s.amax(), "sqp iteration");
      x = x_new;
      f = f_new;
      g = g_new;

      if df < self.config.ftol {
        return Ok(self.finish(x, f, iter, Termination::ObjectiveTolerance));
      }
    }

    Err(AnalyticsError::OptimizationFailure {
      iterations: self.config.max_iters,
      reason: "iteration limit reached".to_string(),
    })
  }

  fn line_search<P>(
    &self,
    problem: &P,
    x: &[f64],
    d: &DVector<f64>,
    f: f64,
    slope: f64,
    constraints: &LinearConstraints,
  ) -> Option<(Vec<f64>, f64)>
  where
    P: CostFunction<Param = Vec<f64>, Output = f64>,
  {
    let mut alpha = 1.0;
    for _ in 0..self.config.max_line_search {
      let mut trial: Vec<f64> = x.iter().zip(d.iter()).map(|(xi, di)| xi + alpha * di).collect();
      constraints.clamp(&mut trial);

      // Trial points outside the objective's domain are treated as rejected.
      if let Ok(ft) = problem.cost(&trial) {
        if ft.is_finite() && ft <= f + ARMIJO_C1 * alpha * slope {
          return Some((trial, ft));
        }
      }
      alpha *= 0.5;
    }
    None
  }

  fn finish(&self, x: Vec<f64>, cost: f64, iterations: u64, termination: Termination) -> SolverReport {
    info!(iterations, cost, ?termination, "sqp converged");
    SolverReport {
      x,
      cost,
      iterations,
      termination,
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  /// `sum_i c_i (x_i - t_i)^2`, separable and convex.
  struct Quadratic {
    c: Vec<f64>,
    t: Vec<f64>,
  }

  impl CostFunction for Quadratic {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
      Ok(
        x.iter()
          .zip(self.c.iter().zip(&self.t))
          .map(|(xi, (ci, ti))| ci * (xi - ti).powi(2))
          .sum(),
      )
    }
  }

  impl Gradient for Quadratic {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, x: &Self::Param) -> std::result::Result<Vec<f64>, argmin::core::Error> {
      Ok(
        x.iter()
          .zip(self.c.iter().zip(&self.t))
          .map(|(xi, (ci, ti))| 2.0 * ci * (xi - ti))
          .collect(),
      )
    }
  }

  #[test]
  fn interior_optimum_on_simplex() {
    // Unconstrained target sums to one, so it is the constrained optimum too.
    let problem = Quadratic {
      c: vec![1.0, 2.0, 3.0],
      t: vec![0.2, 0.5, 0.3],
    };
    let report = Slsqp::default()
      .minimize(&problem, vec![1.0 / 3.0; 3], &LinearConstraints::simplex(3))
      .unwrap();

    for (x, t) in report.x.iter().zip(&problem.t) {
      assert_abs_diff_eq!(*x, *t, epsilon = 1e-6);
    }
  }

  #[test]
  fn projection_onto_simplex_hits_lower_bound() {
    // Euclidean projection of (0.9, 0.6, -0.5) onto the simplex is (0.65, 0.35, 0).
    let problem = Quadratic {
      c: vec![1.0; 3],
      t: vec![0.9, 0.6, -0.5],
    };
    let report = Slsqp::default()
      .minimize(&problem, vec![1.0 / 3.0; 3], &LinearConstraints::simplex(3))
      .unwrap();

    assert_abs_diff_eq!(report.x[0], 0.65, epsilon = 1e-5);
    assert_abs_diff_eq!(report.x[1], 0.35, epsilon = 1e-5);
    assert_abs_diff_eq!(report.x[2], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(report.x.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn vertex_optimum_respects_upper_bound() {
    let problem = Quadratic {
      c: vec![1.0, 1.0],
      t: vec![3.0, -2.0],
    };
    let report = Slsqp::default()
      .minimize(&problem, vec![0.5, 0.5], &LinearConstraints::simplex(2))
      .unwrap();

    assert_abs_diff_eq!(report.x[0], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.x[1], 0.0, epsilon = 1e-9);
  }

  #[test]
  fn infeasible_start_is_rejected() {
    let problem = Quadratic {
      c: vec![1.0, 1.0],
      t: vec![0.5, 0.5],
    };
    let err = Slsqp::default()
      .minimize(&problem, vec![0.9, 0.9], &LinearConstraints::simplex(2))
      .unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidInput(_)));
  }

  #[test]
  fn iteration_cap_fails_closed() {
    let problem = Quadratic {
      c: vec![1.0, 50.0, 0.01],
      t: vec![0.1, 0.7, 0.2],
    };
    let solver = Slsqp::new(SolverConfig {
      max_iters: 1,
      ftol: 0.0,
      xtol: 0.0,
      ..SolverConfig::default()
    });
    let err = solver
      .minimize(&problem, vec![0.8, 0.1, 0.1], &LinearConstraints::simplex(3))
      .unwrap_err();
    assert!(matches!(
      err,
      AnalyticsError::OptimizationFailure { iterations: 1, .. }
    ));
  }

  #[test]
  fn qp_multipliers_release_wrong_bounds() {
    // Start at a vertex: both bounds tight, but the optimum is interior.
    let b = DMatrix::<f64>::identity(2, 2);
    let g = DVector::from_vec(vec![0.5, -0.5]);
    let a = DVector::from_vec(vec![1.0, 1.0]);
    let d = solve_qp(&b, &g, &a, &[-1.0, 0.0], &[0.0, 1.0]).unwrap();
    assert_abs_diff_eq!(d[0], -0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(d[1], 0.5, epsilon = 1e-12);
  }

  #[test]
  fn damped_update_stays_positive_definite() {
    let mut b = DMatrix::<f64>::identity(2, 2);
    let s = DVector::from_vec(vec![1.0, 0.0]);
    let y = DVector::from_vec(vec![-1.0, 0.0]);
    damped_bfgs(&mut b, &s, &y);
    assert!(b.clone().cholesky().is_some());
  }
}
