//! # Quant
//!
//! $$
//! \mu_{ann} = 365.25\,\bar r,\qquad \sigma_{ann} = \sqrt{365.25}\,s_r
//! $$
//!
//! Dataset, index, portfolio and risk stages of the analytics pipeline.

pub mod engine;
pub mod index;
pub mod market;
pub mod portfolio;
pub mod risk;

/// Calendar days per year, including the quarter leap day. Crypto trades every day.
pub const PERIODS_PER_YEAR: f64 = 365.25;

pub use engine::AnalyticsConfig;
pub use engine::AnalyticsEngine;
pub use engine::AnalyticsReport;
