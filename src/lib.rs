//! # tangency-rs
//!
//! Batch analytics over a small basket of crypto assets:
//!
//! - close-price and market-cap tables from daily klines and circulating supply,
//! - log returns and three market indices (price, equal and cap weighted),
//! - the Sharpe-optimal (tangency) portfolio under full-investment and
//!   no-short-selling constraints,
//! - CAPM decomposition of each asset against the tangency and market-cap
//!   portfolios.
//!
//! The entry point is [`quant::engine::AnalyticsEngine`].

pub mod error;
pub mod quant;

pub use error::AnalyticsError;
pub use error::Result;
