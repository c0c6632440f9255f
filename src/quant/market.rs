//! # Market Data
//!
//! $$
//! \text{cap}_{i,t} = \lfloor P_{i,t}\, S_i \rfloor
//! $$
//!
//! Normalizes per-asset daily klines and circulating-supply snapshots into
//! date-indexed close-price and market-cap tables.

pub mod bar;
pub mod dataset;
pub mod panel;

pub use bar::AssetBars;
pub use bar::Bar;
pub use dataset::CirculatingSupply;
pub use dataset::MarketDataset;
pub use dataset::SupplyPolicy;
pub use panel::MarketCapTable;
pub use panel::Panel;
pub use panel::PriceTable;
pub use panel::ReturnTable;
