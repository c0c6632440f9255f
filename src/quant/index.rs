//! # Index
//!
//! $$
//! I^{PWI}_t = 100\frac{\sum_i P_{i,t}}{\sum_i P_{i,0}},\qquad
//! I^{EWI}_t = 100\prod_{k\le t}\Big(1+\tfrac1n\sum_i r_{i,k}\Big),\qquad
//! I^{CWI}_t = 100\prod_{k\le t}\Big(1+\sum_i w_{i,k-1} r_{i,k}\Big)
//! $$
//!
//! Log returns, normalized prices, index weights and the three market indices
//! with their annualized risk and return.

pub mod returns;
pub mod series;
pub mod stats;
pub mod weights;

pub use returns::log_returns;
pub use returns::mean_returns;
pub use returns::normalized_prices;
pub use returns::simple_returns;
pub use series::IndexKind;
pub use series::IndexSeries;
pub use series::MarketIndices;
pub use stats::annualized_risk_return;
pub use stats::annualized_table;
pub use stats::correlation_matrix;
pub use stats::covariance_matrix;
pub use stats::stats_index;
pub use stats::RiskReturn;
pub use stats::RiskReturnTable;
pub use weights::cap_weights;
pub use weights::equal_weights;
pub use weights::lagged_weighted_returns;
pub use weights::price_weights;
