//! # Analytics Engine
//!
//! $$
//! \text{bars} \to P \to r \to \{I^{PWI}, I^{EWI}, I^{CWI}\} \to \mathbf w^\* \to (\beta, \alpha)
//! $$
//!
//! Runs the dataset, index, portfolio and risk stages in order over one
//! basket of assets.

use ndarray::Array1;
use ndarray::Array2;
use tracing::info;

use super::index::correlation_matrix;
use super::index::log_returns;
use super::index::mean_returns;
use super::index::stats_index;
use super::index::MarketIndices;
use super::index::RiskReturnTable;
use super::market::AssetBars;
use super::market::CirculatingSupply;
use super::market::MarketDataset;
use super::market::ReturnTable;
use super::market::SupplyPolicy;
use super::portfolio::optimize_tangency;
use super::portfolio::with_tangency_column;
use super::portfolio::OptimalWeights;
use super::portfolio::SolverConfig;
use super::portfolio::TANGENCY_COLUMN;
use super::risk::decompose;
use super::risk::with_market_cap_column;
use super::risk::StatisticsTable;
use super::risk::MARKET_CAP_COLUMN;
use super::PERIODS_PER_YEAR;
use crate::error::Result;

/// Runtime configuration for [`AnalyticsEngine`].
#[derive(Clone, Copy, Debug)]
pub struct AnalyticsConfig {
  /// Annual risk-free rate used for Sharpe, the optimizer and CAPM.
  pub risk_free: f64,
  /// Annualization factor for means, deviations and covariances.
  pub periods_per_year: f64,
  /// What to do with assets lacking a circulating-supply figure.
  pub supply_policy: SupplyPolicy,
  pub solver: SolverConfig,
}

impl Default for AnalyticsConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.031,
      periods_per_year: PERIODS_PER_YEAR,
      supply_policy: SupplyPolicy::Exclude,
      solver: SolverConfig::default(),
    }
  }
}

/// Everything one run produces.
#[derive(Clone, Debug)]
pub struct AnalyticsReport {
  pub dataset: MarketDataset,
  /// Daily log returns of the asset columns.
  pub returns: ReturnTable,
  pub indices: MarketIndices,
  /// Annualized risk and return of normalized assets and the three indices.
  pub index_stats: RiskReturnTable,
  /// Mean daily log return per asset.
  pub mean_returns: Array1<f64>,
  /// Pearson correlation of asset returns, in asset column order.
  pub correlation: Array2<f64>,
  pub optimal_weights: OptimalWeights,
  /// Decomposition against the tangency portfolio (`TP`).
  pub tangency: StatisticsTable,
  /// Decomposition against the market-cap portfolio (`MCAP`).
  pub market_cap: StatisticsTable,
}

impl AnalyticsReport {
  /// Assets left out of market-cap aggregation.
  pub fn missing_supply(&self) -> &[String] {
    self.dataset.missing_supply()
  }
}

/// Single entry point for the analytics pipeline.
#[derive(Clone, Debug, Default)]
pub struct AnalyticsEngine {
  config: AnalyticsConfig,
}

impl AnalyticsEngine {
  pub fn new(config: AnalyticsConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &AnalyticsConfig {
    &self.config
  }

  /// Run every stage. The first failing stage aborts the run.
  ///
  /// Correlation runs after both decompositions, so a riskless asset is
  /// reported by the Sharpe/beta guard rather than by the correlation.
  pub fn run(&self, assets: &[AssetBars], supply: &CirculatingSupply) -> Result<AnalyticsReport> {
    let cfg = &self.config;

    let dataset = MarketDataset::from_bars(assets, supply, cfg.supply_policy)?;
    let prices = dataset.close_prices();
    info!(
      assets = prices.n_cols(),
      dates = prices.n_rows(),
      excluded = dataset.missing_supply().len(),
      "dataset loaded"
    );

    let returns = log_returns(prices)?;
    let indices = MarketIndices::build(prices, &returns, dataset.market_cap())?;
    let index_stats = stats_index(&indices, cfg.periods_per_year)?;
    let mean_returns = mean_returns(&returns)?;
    info!("indices built");

    let optimal_weights = optimize_tangency(&returns, cfg.risk_free, cfg.periods_per_year, &cfg.solver)?;

    let with_tp = with_tangency_column(&returns, &optimal_weights)?;
    let tangency = decompose(&with_tp, TANGENCY_COLUMN, cfg.risk_free, cfg.periods_per_year)?;

    let with_mcap = with_market_cap_column(&returns, &indices.cap_weights)?;
    let market_cap = decompose(&with_mcap, MARKET_CAP_COLUMN, cfg.risk_free, cfg.periods_per_year)?;
    info!(sharpe = optimal_weights.sharpe, "risk decomposition done");

    let correlation = correlation_matrix(&returns)?;

    Ok(AnalyticsReport {
      dataset,
      returns,
      indices,
      index_stats,
      mean_returns,
      correlation,
      optimal_weights,
      tangency,
      market_cap,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::quant::market::Bar;

  const START_MS: i64 = 1_704_153_599_999;
  const DAY_MS: i64 = 86_400_000;

  fn asset(symbol: &str, closes: &[f64]) -> AssetBars {
    AssetBars::new(
      symbol.to_string(),
      closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
          open_time: START_MS + 1 - DAY_MS + i as i64 * DAY_MS,
          close_time: START_MS + i as i64 * DAY_MS,
          open: close,
          high: close,
          low: close,
          close,
          ..Bar::default()
        })
        .collect(),
    )
  }

  fn basket() -> Vec<AssetBars> {
    vec![
      asset("BTC", &[42_000.0, 43_100.0, 42_500.0, 44_000.0, 43_700.0, 45_200.0]),
      asset("ETH", &[2_300.0, 2_280.0, 2_350.0, 2_400.0, 2_330.0, 2_410.0]),
      asset("SOL", &[100.0, 104.0, 99.0, 103.0, 108.0, 106.0]),
    ]
  }

  fn supply() -> CirculatingSupply {
    CirculatingSupply::parse("BTC 19600000\nETH 120000000\nSOL 440000000\n").unwrap()
  }

  #[test]
  fn default_config() {
    let cfg = AnalyticsConfig::default();
    assert_eq!(cfg.risk_free, 0.031);
    assert_eq!(cfg.periods_per_year, 365.25);
    assert_eq!(cfg.supply_policy, SupplyPolicy::Exclude);
    assert_eq!(cfg.solver.max_iters, 200);
  }

  #[test]
  fn run_produces_every_table() {
    let report = AnalyticsEngine::default().run(&basket(), &supply()).unwrap();

    assert_eq!(report.returns.n_rows(), 5);
    assert_eq!(report.mean_returns.len(), 3);
    assert_eq!(report.correlation.dim(), (3, 3));
    assert_eq!(report.optimal_weights.assets, ["BTC", "ETH", "SOL"]);
    assert_eq!(report.index_stats.len(), 6);
    assert_eq!(report.tangency.benchmark(), "TP");
    assert_eq!(report.tangency.len(), 4);
    assert_eq!(report.market_cap.benchmark(), "MCAP");
    assert_eq!(report.market_cap.len(), 4);
    assert!(report.missing_supply().is_empty());
  }

  #[test]
  fn failing_stage_aborts_the_run() {
    let mut assets = basket();
    assets[1].bars.pop();
    assert!(AnalyticsEngine::default().run(&assets, &supply()).is_err());
  }
}
