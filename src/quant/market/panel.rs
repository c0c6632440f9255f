//! # Panel
//!
//! Date x asset table backed by an [`ndarray::Array2`]. Rows are dates in
//! ascending order, columns are named series (assets, or derived columns
//! such as `TP` and `MCAP`).

use chrono::NaiveDate;
use ndarray::concatenate;
use ndarray::s;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;

use crate::error::AnalyticsError;
use crate::error::Result;

/// Close prices per date and asset.
pub type PriceTable = Panel<f64>;
/// Market capitalization per date and asset.
pub type MarketCapTable = Panel<i64>;
/// Log returns per date and asset. The first price date has no row.
pub type ReturnTable = Panel<f64>;

/// Immutable date-indexed table with named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel<T> {
  dates: Vec<NaiveDate>,
  columns: Vec<String>,
  values: Array2<T>,
}

impl<T: Clone> Panel<T> {
  /// Build a panel, checking that `values` is `dates.len() x columns.len()`
  /// and that dates strictly increase.
  pub fn new(dates: Vec<NaiveDate>, columns: Vec<String>, values: Array2<T>) -> Result<Self> {
    if values.dim() != (dates.len(), columns.len()) {
      return Err(AnalyticsError::InvalidInput(format!(
        "panel shape {:?} does not match {} dates x {} columns",
        values.dim(),
        dates.len(),
        columns.len()
      )));
    }

    if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
      return Err(AnalyticsError::InvalidInput(format!(
        "panel dates must strictly increase, {} is followed by {}",
        pair[0], pair[1]
      )));
    }

    for (i, name) in columns.iter().enumerate() {
      if columns[..i].contains(name) {
        return Err(AnalyticsError::InvalidInput(format!(
          "duplicate column {name}"
        )));
      }
    }

    Ok(Self {
      dates,
      columns,
      values,
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  /// Raw values, one row per date.
  pub fn values(&self) -> &Array2<T> {
    &self.values
  }

  pub fn n_rows(&self) -> usize {
    self.dates.len()
  }

  pub fn n_cols(&self) -> usize {
    self.columns.len()
  }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  /// Series of one column.
  pub fn column(&self, name: &str) -> Result<ArrayView1<'_, T>> {
    let idx = self
      .column_index(name)
      .ok_or_else(|| AnalyticsError::UnknownColumn(name.to_string()))?;
    Ok(self.values.column(idx))
  }

  /// Cell lookup by date and column name.
  pub fn get(&self, date: NaiveDate, name: &str) -> Option<&T> {
    let row = self.dates.binary_search(&date).ok()?;
    let col = self.column_index(name)?;
    self.values.get((row, col))
  }

  /// New panel with `series` appended as the last column.
  pub fn with_column(&self, name: &str, series: Array1<T>) -> Result<Self> {
    if self.column_index(name).is_some() {
      return Err(AnalyticsError::InvalidInput(format!(
        "column {name} already present"
      )));
    }
    if series.len() != self.n_rows() {
      return Err(AnalyticsError::InvalidInput(format!(
        "column {name} has {} rows, panel has {}",
        series.len(),
        self.n_rows()
      )));
    }

    let values = concatenate(
      Axis(1),
      &[self.values.view(), series.view().insert_axis(Axis(1))],
    )
    .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))?;

    let mut columns = self.columns.clone();
    columns.push(name.to_string());

    Ok(Self {
      dates: self.dates.clone(),
      columns,
      values,
    })
  }

  /// New panel restricted to `names`, in that order.
  pub fn select(&self, names: &[String]) -> Result<Self> {
    let idx = names
      .iter()
      .map(|n| {
        self
          .column_index(n)
          .ok_or_else(|| AnalyticsError::UnknownColumn(n.clone()))
      })
      .collect::<Result<Vec<_>>>()?;

    Self::new(
      self.dates.clone(),
      names.to_vec(),
      self.values.select(Axis(1), &idx),
    )
  }

  /// New panel without column `name`.
  pub fn without_column(&self, name: &str) -> Result<Self> {
    if self.column_index(name).is_none() {
      return Err(AnalyticsError::UnknownColumn(name.to_string()));
    }
    let keep: Vec<String> = self
      .columns
      .iter()
      .filter(|c| c.as_str() != name)
      .cloned()
      .collect();
    self.select(&keep)
  }

  /// New panel without its first `k` rows.
  pub fn skip_rows(&self, k: usize) -> Self {
    let k = k.min(self.n_rows());
    Self {
      dates: self.dates[k..].to_vec(),
      columns: self.columns.clone(),
      values: self.values.slice(s![k.., ..]).to_owned(),
    }
  }
}
