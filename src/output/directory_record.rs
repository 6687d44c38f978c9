// 该文件是 Cheti （车体） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{DateTime, Datelike, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectionBatch,
  model::VehicleTable,
  output::{
    Render,
    csv_file::write_table,
    metadata::{MetadataError, MetadataTemplate},
  },
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("CSV 错误: {0}")]
  CsvError(#[from] csv::Error),
  #[error("元数据错误: {0}")]
  MetadataError(#[from] MetadataError),
}

/// 每个来源单独写一张表，按日期分目录存放
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  metadata: Option<MetadataTemplate>,
  table_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = !uri.query_pairs().any(|(k, _)| k == "skip-empty");

    Ok(DirectoryRecordOutput {
      directory: url_path(uri),
      metadata: MetadataTemplate::from_query(uri, true),
      table_counters: Arc::new(Mutex::new(0)),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn table_id(&self) -> u16 {
    let mut counter = self
      .table_counters
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn table_path(&self, now: DateTime<Utc>) -> Result<PathBuf, std::io::Error> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.csv",
      now.format("%H-%M-%S"),
      self.table_id()
    )))
  }

  fn save(&self, path: &Path, result: &VehicleTable) -> Result<(), DirectoryRecordOutputError> {
    write_table(File::create(path)?, &result.rows, true)?;
    info!(
      "{}: 写入 {} 行到 {}",
      result.source,
      result.len(),
      path.display()
    );

    if let Some(template) = &self.metadata {
      template
        .describe(
          path,
          vec![result.source.clone()],
          result.config,
          result.report,
        )
        .save(&path.with_extension("json"))?;
    }
    Ok(())
  }
}

impl Render<DetectionBatch, VehicleTable> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, _input: &DetectionBatch, result: &VehicleTable) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      info!("{}: 没有保留的车辆对象，跳过写出", result.source);
      return Ok(());
    }
    let path = self.table_path(Utc::now())?;
    self.save(&path, result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn dated_layout_with_counter() {
    let root = std::env::temp_dir().join(format!("cheti-dir-record-{}", std::process::id()));
    let url = url::Url::parse(&format!("folder://{}", root.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let now = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
    let first = output.table_path(now).unwrap();
    let second = output.table_path(now).unwrap();
    assert_eq!(first, root.join("2026/03/09/07-05-01-0001.csv"));
    assert_eq!(second, root.join("2026/03/09/07-05-01-0002.csv"));

    let _ = std::fs::remove_dir_all(&root);
  }

  #[test]
  fn skip_empty_flag() {
    let url = url::Url::parse("folder:///tmp/cheti?skip-empty&metadata=false").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert!(!output.always);
    assert!(output.metadata.is_none());
  }
}
