// 该文件是 Cheti （车体） 项目的一部分。
// src/reference.rs - 参考车型表与属性匹配
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_path};

const COLUMN_LENGTH: &str = "Length";
const COLUMN_WIDTH: &str = "Width";
const COLUMN_HEIGHT: &str = "Height";
const COLUMN_WEIGHT: &str = "Weight";

#[derive(Error, Debug)]
pub enum ReferenceTableError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("CSV 错误: {0}")]
  CsvError(#[from] csv::Error),
  #[error("参考表缺少列: {0}")]
  MissingColumn(&'static str),
  #[error("参考表第 {row} 行 {column} 列的值无效: {value:?}")]
  InvalidValue {
    row: usize,
    column: &'static str,
    value: String,
  },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceVehicle {
  pub length: f64,
  pub width: f64,
  pub height: f64,
  pub mass: f64,
}

/// 匹配得到的物理属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleAttributes {
  pub height: f64,
  pub mass: f64,
}

/// 已知车型表，加载后只读
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
  rows: Box<[ReferenceVehicle]>,
}

impl From<Vec<ReferenceVehicle>> for ReferenceTable {
  fn from(rows: Vec<ReferenceVehicle>) -> Self {
    ReferenceTable {
      rows: rows.into_boxed_slice(),
    }
  }
}

impl FromUrlWithScheme for ReferenceTable {
  const SCHEME: &'static str = "csv";
}

impl FromUrl for ReferenceTable {
  type Error = ReferenceTableError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReferenceTableError::SchemeMismatch);
    }

    let path = url_path(url);
    info!("加载参考车型表: {}", path.display());
    let file = std::fs::File::open(&path)?;
    let table = Self::from_reader(file)?;
    info!("参考车型表共 {} 行", table.len());
    Ok(table)
  }
}

fn column_index(headers: &StringRecord, name: &'static str) -> Result<usize, ReferenceTableError> {
  headers
    .iter()
    .position(|h| h == name)
    .ok_or(ReferenceTableError::MissingColumn(name))
}

/// 空单元格读作 NaN，与其余无法解析的值区分开
fn cell(record: &StringRecord, row: usize, index: usize, column: &'static str) -> Result<f64, ReferenceTableError> {
  let value = record.get(index).unwrap_or("");
  if value.is_empty() {
    return Ok(f64::NAN);
  }
  value
    .parse::<f64>()
    .map_err(|_| ReferenceTableError::InvalidValue {
      row,
      column,
      value: value.to_string(),
    })
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
  let (sum, count) = values
    .filter(|v| !v.is_nan())
    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
  if count == 0 {
    f64::NAN
  } else {
    sum / count as f64
  }
}

impl ReferenceTable {
  /// 读取带表头的分隔文本，首列为索引，按列名取
  /// `Length`、`Width`、`Height`、`Weight`
  pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReferenceTableError> {
    let mut reader = ReaderBuilder::new()
      .has_headers(true)
      .flexible(true)
      .trim(Trim::All)
      .from_reader(reader);

    let headers = reader.headers()?.clone();
    let length = column_index(&headers, COLUMN_LENGTH)?;
    let width = column_index(&headers, COLUMN_WIDTH)?;
    let height = column_index(&headers, COLUMN_HEIGHT)?;
    let weight = column_index(&headers, COLUMN_WEIGHT)?;

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
      let record = record?;
      rows.push(ReferenceVehicle {
        length: cell(&record, row, length, COLUMN_LENGTH)?,
        width: cell(&record, row, width, COLUMN_WIDTH)?,
        height: cell(&record, row, height, COLUMN_HEIGHT)?,
        mass: cell(&record, row, weight, COLUMN_WEIGHT)?,
      });
    }

    Ok(ReferenceTable::from(rows))
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn rows(&self) -> &[ReferenceVehicle] {
    &self.rows
  }

  /// 长宽均落在检测值 ±`tolerance_pct`% 窗口内的参考车型
  ///
  /// 窗口相对检测值而非参考值。
  pub fn select(
    &self,
    length: f64,
    width: f64,
    tolerance_pct: f64,
  ) -> impl Iterator<Item = &ReferenceVehicle> {
    let length_tol = length * 0.01 * tolerance_pct;
    let width_tol = width * 0.01 * tolerance_pct;
    self.rows.iter().filter(move |r| {
      (r.length - length).abs() <= length_tol && (r.width - width).abs() <= width_tol
    })
  }

  /// 对窗口内所有车型的高度与质量取算术平均，没有匹配时返回 `None`
  pub fn match_attributes(
    &self,
    length: f64,
    width: f64,
    tolerance_pct: f64,
  ) -> Option<VehicleAttributes> {
    let selected: Vec<&ReferenceVehicle> = self.select(length, width, tolerance_pct).collect();
    if selected.is_empty() {
      return None;
    }

    Some(VehicleAttributes {
      height: nan_mean(selected.iter().map(|r| r.height)),
      mass: nan_mean(selected.iter().map(|r| r.mass)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "\
,Make,Length,Width,Height,Weight
0,Hatch,4.0,1.8,1.5,1200
1,Saloon,4.2,1.8,1.4,1400
2,Van,5.5,2.0,2.2,2500
";

  fn vehicle(length: f64, width: f64, height: f64, mass: f64) -> ReferenceVehicle {
    ReferenceVehicle {
      length,
      width,
      height,
      mass,
    }
  }

  #[test]
  fn loads_named_columns_and_skips_index() {
    let table = ReferenceTable::from_reader(SAMPLE.as_bytes()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[2], vehicle(5.5, 2.0, 2.2, 2500.0));
  }

  #[test]
  fn column_order_is_free() {
    let text = "idx,Weight,Height,Width,Length\n0,900,1.3,1.6,3.5\n";
    let table = ReferenceTable::from_reader(text.as_bytes()).unwrap();
    assert_eq!(table.rows()[0], vehicle(3.5, 1.6, 1.3, 900.0));
  }

  #[test]
  fn missing_weight_column_is_fatal() {
    let text = ",Length,Width,Height\n0,4.0,1.8,1.5\n";
    let err = ReferenceTable::from_reader(text.as_bytes()).unwrap_err();
    assert!(matches!(err, ReferenceTableError::MissingColumn("Weight")));
  }

  #[test]
  fn non_numeric_cell_is_fatal() {
    let text = ",Length,Width,Height,Weight\n0,long,1.8,1.5,1200\n";
    let err = ReferenceTable::from_reader(text.as_bytes()).unwrap_err();
    assert!(matches!(
      err,
      ReferenceTableError::InvalidValue {
        row: 0,
        column: "Length",
        ..
      }
    ));
  }

  #[test]
  fn single_match_returns_row_exactly() {
    let table = ReferenceTable::from_reader(SAMPLE.as_bytes()).unwrap();
    let attrs = table.match_attributes(5.5, 2.0, 10.0).unwrap();
    assert_eq!(attrs.height, 2.2);
    assert_eq!(attrs.mass, 2500.0);
  }

  #[test]
  fn multiple_matches_are_averaged() {
    let table = ReferenceTable::from_reader(SAMPLE.as_bytes()).unwrap();
    let attrs = table.match_attributes(4.1, 1.8, 10.0).unwrap();
    assert!((attrs.height - 1.45).abs() < 1e-12);
    assert!((attrs.mass - 1300.0).abs() < 1e-9);
  }

  #[test]
  fn tolerance_is_relative_to_detection() {
    // 检测长 10、容差 10%：窗口为 [9, 11]，参考长 11 落在窗口内
    let table = ReferenceTable::from(vec![vehicle(11.0, 1.0, 1.0, 1.0)]);
    assert!(table.match_attributes(10.0, 1.0, 10.0).is_some());
    // 检测长 12、容差 10%：窗口为 [10.8, 13.2]，参考长 11 也在窗口内
    assert!(table.match_attributes(12.0, 1.0, 10.0).is_some());
    // 检测长 9.9：窗口上限 10.89 < 11
    assert!(table.match_attributes(9.9, 1.0, 10.0).is_none());
  }

  #[test]
  fn no_match_is_none() {
    let table = ReferenceTable::from_reader(SAMPLE.as_bytes()).unwrap();
    assert!(table.match_attributes(1.0, 0.5, 10.0).is_none());
    assert!(ReferenceTable::default().match_attributes(4.0, 1.8, 10.0).is_none());
  }

  #[test]
  fn widening_tolerance_never_shrinks_selection() {
    let table = ReferenceTable::from_reader(SAMPLE.as_bytes()).unwrap();
    let mut previous = 0;
    for tolerance in [0.0, 1.0, 5.0, 10.0, 20.0, 40.0, 80.0] {
      let count = table.select(4.6, 1.9, tolerance).count();
      assert!(count >= previous, "tolerance {tolerance}: {count} < {previous}");
      previous = count;
    }
    assert_eq!(previous, 3);
  }

  #[test]
  fn empty_cells_are_skipped_by_mean() {
    let text = ",Length,Width,Height,Weight\n0,4.0,1.8,,1200\n1,4.0,1.8,1.5,\n";
    let table = ReferenceTable::from_reader(text.as_bytes()).unwrap();
    let attrs = table.match_attributes(4.0, 1.8, 10.0).unwrap();
    assert_eq!(attrs.height, 1.5);
    assert_eq!(attrs.mass, 1200.0);
  }

  #[test]
  fn scheme_must_be_csv() {
    let url = Url::parse("bbox:///tmp/table.csv").unwrap();
    assert!(matches!(
      ReferenceTable::from_url(&url),
      Err(ReferenceTableError::SchemeMismatch)
    ));
  }
}
