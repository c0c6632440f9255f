//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Tangency portfolio optimization under full-investment and no-short-selling
//! constraints.

pub mod objective;
pub mod optimizers;
pub mod slsqp;
pub mod types;

pub use objective::SharpeObjective;
pub use optimizers::optimize_tangency;
pub use optimizers::tangency_returns;
pub use optimizers::with_tangency_column;
pub use optimizers::TANGENCY_COLUMN;
pub use slsqp::LinearConstraints;
pub use slsqp::Slsqp;
pub use types::OptimalWeights;
pub use types::SolverConfig;
pub use types::SolverReport;
pub use types::Termination;
