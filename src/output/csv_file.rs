// 该文件是 Cheti （车体） 项目的一部分。
// src/output/csv_file.rs - CSV 文件输出
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

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use csv::WriterBuilder;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectionBatch,
  model::{BatchReport, VEHICLE_TABLE_HEADER, VehicleObject, VehicleTable},
  output::{
    Render,
    metadata::{MetadataError, MetadataTemplate},
  },
  url_path,
};

#[derive(Error, Debug)]
pub enum CsvFileOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("CSV 错误: {0}")]
  CsvError(#[from] csv::Error),
  #[error("元数据错误: {0}")]
  MetadataError(#[from] MetadataError),
}

/// 写出车辆表，不带索引列
pub fn write_table<W: Write>(
  writer: W,
  rows: &[VehicleObject],
  with_header: bool,
) -> Result<(), csv::Error> {
  let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
  if with_header {
    writer.write_record(VEHICLE_TABLE_HEADER)?;
  }
  for row in rows {
    writer.serialize(row)?;
  }
  writer.flush()?;
  Ok(())
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

#[derive(Default)]
struct Written {
  sources: Vec<String>,
  report: BatchReport,
}

/// 所有来源写入同一个 CSV 文件，表头只写一次
pub struct CsvFileOutput {
  path: PathBuf,
  metadata: Option<MetadataTemplate>,
  written: Mutex<Option<Written>>,
}

impl FromUrlWithScheme for CsvFileOutput {
  const SCHEME: &'static str = "csv";
}

impl FromUrl for CsvFileOutput {
  type Error = CsvFileOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(CsvFileOutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(CsvFileOutput {
      path: url_path(uri),
      metadata: MetadataTemplate::from_query(uri, false),
      written: Mutex::new(None),
    })
  }
}

impl CsvFileOutput {
  pub fn path(&self) -> &Path {
    &self.path
  }

  fn metadata_path(&self) -> PathBuf {
    self.path.with_extension("json")
  }
}

impl Render<DetectionBatch, VehicleTable> for CsvFileOutput {
  type Error = CsvFileOutputError;

  fn render_result(&self, _input: &DetectionBatch, result: &VehicleTable) -> Result<(), Self::Error> {
    let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
    let first = written.is_none();

    let file = if first {
      ensure_parent(&self.path)?;
      OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&self.path)?
    } else {
      OpenOptions::new().append(true).open(&self.path)?
    };
    write_table(file, &result.rows, first)?;
    info!(
      "{}: 写入 {} 行到 {}",
      result.source,
      result.len(),
      self.path.display()
    );

    let state = written.get_or_insert_with(Written::default);
    state.sources.push(result.source.clone());
    state.report.merge(&result.report);

    if let Some(template) = &self.metadata {
      template
        .describe(
          &self.path,
          state.sources.clone(),
          result.config,
          state.report,
        )
        .save(&self.metadata_path())?;
    }

    Ok(())
  }
}
