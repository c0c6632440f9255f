use std::env;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;

use anyhow::bail;
use anyhow::Context;
use prettytable::row;
use prettytable::Cell;
use prettytable::Table;
use tangency_rs::quant::index::RiskReturnTable;
use tangency_rs::quant::market::AssetBars;
use tangency_rs::quant::market::Bar;
use tangency_rs::quant::market::CirculatingSupply;
use tangency_rs::quant::risk::StatisticsTable;
use tangency_rs::quant::AnalyticsConfig;
use tangency_rs::quant::AnalyticsEngine;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: tangency SUPPLY_FILE SYMBOL=KLINES_CSV [SYMBOL=KLINES_CSV ...]";

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args: Vec<String> = env::args().skip(1).collect();
  let Some((supply_path, asset_args)) = args.split_first() else {
    bail!(USAGE);
  };
  if asset_args.is_empty() {
    bail!(USAGE);
  }

  let supply_text = std::fs::read_to_string(supply_path)
    .with_context(|| format!("reading supply file {supply_path}"))?;
  let supply = CirculatingSupply::parse(&supply_text)?;

  let assets = asset_args
    .iter()
    .map(|arg| {
      let Some((symbol, path)) = arg.split_once('=') else {
        bail!("expected SYMBOL=KLINES_CSV, got {arg}");
      };
      read_klines(symbol, path)
    })
    .collect::<anyhow::Result<Vec<_>>>()?;

  let mut config = AnalyticsConfig::default();
  if let Ok(rf) = env::var("RISK_FREE") {
    config.risk_free = rf
      .parse()
      .with_context(|| format!("RISK_FREE must be a number, got {rf}"))?;
  }

  let report = AnalyticsEngine::new(config).run(&assets, &supply)?;

  if !report.missing_supply().is_empty() {
    println!(
      "excluded from market-cap aggregation: {}",
      report.missing_supply().join(", ")
    );
  }

  println!("\nIndex statistics");
  print_risk_return(&report.index_stats);

  println!("\nMean daily log returns");
  let mut means = Table::new();
  means.set_titles(row!["Asset", "Mean"]);
  for (asset, m) in report.returns.columns().iter().zip(report.mean_returns.iter()) {
    means.add_row(row![asset, format!("{m:.6}")]);
  }
  means.printstd();

  println!("\nCorrelation");
  let mut corr = Table::new();
  let mut titles = row![""];
  for asset in report.returns.columns() {
    titles.add_cell(Cell::new(asset));
  }
  corr.set_titles(titles);
  for (i, asset) in report.returns.columns().iter().enumerate() {
    let mut r = row![asset];
    for v in report.correlation.row(i) {
      r.add_cell(Cell::new(&format!("{v:.4}")));
    }
    corr.add_row(r);
  }
  corr.printstd();

  println!("\nTangency portfolio weights");
  let mut weights = Table::new();
  weights.set_titles(row!["Asset", "Weight"]);
  for (asset, w) in report
    .optimal_weights
    .assets
    .iter()
    .zip(report.optimal_weights.weights.iter())
  {
    weights.add_row(row![asset, format!("{w:.4}")]);
  }
  weights.printstd();
  println!(
    "return {:.4}  risk {:.4}  sharpe {:.4}  ({} iterations)",
    report.optimal_weights.expected_return,
    report.optimal_weights.volatility,
    report.optimal_weights.sharpe,
    report.optimal_weights.iterations
  );

  println!("\nRisk decomposition vs {}", report.tangency.benchmark());
  print_statistics(&report.tangency);
  println!("\nRisk decomposition vs {}", report.market_cap.benchmark());
  print_statistics(&report.market_cap);

  Ok(())
}

fn read_klines(symbol: &str, path: &str) -> anyhow::Result<AssetBars> {
  let file = File::open(path).with_context(|| format!("opening {path}"))?;
  let reader = BufReader::new(file);
  let mut bars = Vec::new();

  for (i, line) in reader.lines().enumerate() {
    let line = line.with_context(|| format!("reading {path}"))?;
    let fields: Vec<&str> = line.split(',').collect();
    // Header rows start with a column name instead of a timestamp.
    if line.trim().is_empty() || (i == 0 && fields[0].trim().parse::<i64>().is_err()) {
      continue;
    }
    bars.push(Bar::from_record(&fields, i + 1).with_context(|| format!("parsing {path}"))?);
  }

  Ok(AssetBars::new(symbol.to_string(), bars))
}

fn print_risk_return(stats: &RiskReturnTable) {
  let mut table = Table::new();
  table.set_titles(row!["Series", "Return", "Risk"]);
  for (name, rr) in &stats.rows {
    table.add_row(row![
      name,
      format!("{:.4}", rr.annual_return),
      format!("{:.4}", rr.risk)
    ]);
  }
  table.printstd();
}

fn print_statistics(stats: &StatisticsTable) {
  let mut table = Table::new();
  table.set_titles(row![
    "Asset", "Return", "Risk", "Sharpe", "Variance", "Sys Var", "Unsys Var", "beta", "CAPM", "alpha"
  ]);
  for (name, s) in stats.rows() {
    table.add_row(row![
      name,
      format!("{:.4}", s.annual_return),
      format!("{:.4}", s.risk),
      format!("{:.4}", s.sharpe),
      format!("{:.4}", s.variance),
      format!("{:.4}", s.systematic_variance),
      format!("{:.4}", s.unsystematic_variance),
      format!("{:.4}", s.beta),
      format!("{:.4}", s.capm),
      format!("{:.4}", s.alpha)
    ]);
  }
  table.printstd();
}
