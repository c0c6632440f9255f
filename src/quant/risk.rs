//! # Risk
//!
//! $$
//! \sigma_i^2 = \underbrace{\operatorname{Cov}(r_i, r_b)}_{\text{systematic}} + \underbrace{\big(\sigma_i^2 - \operatorname{Cov}(r_i, r_b)\big)}_{\text{unsystematic}}
//! $$
//!
//! Benchmark-relative risk decomposition, run against the tangency and
//! market-cap portfolios.

pub mod decomposition;

pub use decomposition::decompose;
pub use decomposition::market_cap_returns;
pub use decomposition::with_market_cap_column;
pub use decomposition::AssetStatistics;
pub use decomposition::StatisticsTable;
pub use decomposition::MARKET_CAP_COLUMN;
