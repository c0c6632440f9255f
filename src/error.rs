//! # Errors
//!
//! Failure taxonomy shared by every stage of the analytics pipeline.
//! All variants are fatal for the run that raises them.

use thiserror::Error;

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors raised while building datasets, indices, portfolios or risk tables.
#[derive(Debug, Error)]
pub enum AnalyticsError {
  /// Bar tables of different assets do not share one daily calendar.
  #[error("misaligned calendar for {symbol}: {reason}")]
  MisalignedCalendar {
    /// Asset whose bars disagree with the reference calendar.
    symbol: String,
    /// What went wrong.
    reason: String,
  },

  /// Assets present in price data without a circulating-supply entry.
  #[error("missing circulating supply for {}", symbols.join(", "))]
  MissingSupply {
    /// Symbols lacking a supply figure.
    symbols: Vec<String>,
  },

  /// A logarithm or division hit a non-positive or zero operand.
  #[error("numeric domain error in {context}: {value}")]
  NumericDomain {
    /// Computation that failed.
    context: String,
    /// Offending operand.
    value: f64,
  },

  /// The constrained solver stopped without meeting its convergence criteria.
  #[error("optimization failed after {iterations} iterations: {reason}")]
  OptimizationFailure {
    /// Iterations performed before giving up.
    iterations: u64,
    /// Termination reason.
    reason: String,
  },

  /// A market cap does not fit into an `i64`.
  #[error("market cap of {symbol} overflows i64: {value}")]
  IntegerOverflow {
    /// Asset whose market cap overflowed.
    symbol: String,
    /// Untruncated product of price and supply.
    value: f64,
  },

  /// Not enough rows for the requested statistic.
  #[error("insufficient data: need at least {required} rows, got {actual}")]
  InsufficientData {
    /// Minimum number of rows.
    required: usize,
    /// Rows available.
    actual: usize,
  },

  /// Column lookup by name failed.
  #[error("unknown column: {0}")]
  UnknownColumn(String),

  /// Structurally invalid input (shape mismatch, infeasible start point, ...).
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// A kline or supply record could not be parsed.
  #[error("parse error at line {line}: {reason}")]
  Parse {
    /// 1-based line number.
    line: usize,
    /// Parser message.
    reason: String,
  },
}

impl AnalyticsError {
  pub(crate) fn domain(context: impl Into<String>, value: f64) -> Self {
    Self::NumericDomain {
      context: context.into(),
      value,
    }
  }

  /// Recover an [`AnalyticsError`] that travelled through argmin's error type.
  pub(crate) fn from_argmin(err: argmin::core::Error, iterations: u64) -> Self {
    match err.downcast::<AnalyticsError>() {
      Ok(inner) => inner,
      Err(other) => Self::OptimizationFailure {
        iterations,
        reason: other.to_string(),
      },
    }
  }
}
