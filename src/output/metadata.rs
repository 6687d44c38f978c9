// 该文件是 Cheti （车体） 项目的一部分。
// src/output/metadata.rs - 输出表的元数据描述
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

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  config::Config,
  model::{BatchReport, VEHICLE_TABLE_HEADER},
};

const DEFAULT_TITLE: &str = "Vehicle objects";
const DEFAULT_DESCRIPTION: &str =
  "Vehicles derived from oriented bounding box detections, with height and mass matched against a reference table";

#[derive(Error, Debug)]
pub enum MetadataError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 从输出 URL 的查询参数中读取的元数据字段
///
/// `metadata` 控制是否写出，`title`、`description`、`license` 覆盖默认值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTemplate {
  pub title: Option<String>,
  pub description: Option<String>,
  pub license: Option<String>,
}

impl MetadataTemplate {
  /// `default_enabled` 为查询中没有 `metadata` 参数时的取值
  pub fn from_query(url: &Url, default_enabled: bool) -> Option<Self> {
    let mut enabled = default_enabled;
    let mut template = MetadataTemplate::default();
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "metadata" => enabled = !matches!(v.as_ref(), "false" | "0" | "no"),
        "title" => template.title = Some(v.into_owned()),
        "description" => template.description = Some(v.into_owned()),
        "license" => template.license = Some(v.into_owned()),
        _ => {}
      }
    }
    enabled.then_some(template)
  }

  pub fn describe(
    &self,
    table_file: &Path,
    sources: Vec<String>,
    config: Config,
    report: BatchReport,
  ) -> Metadata {
    let title = match (&self.title, sources.as_slice()) {
      (Some(title), _) => title.clone(),
      (None, [source]) => format!("{} ({})", DEFAULT_TITLE, source),
      (None, _) => DEFAULT_TITLE.to_string(),
    };

    Metadata {
      title,
      description: self
        .description
        .clone()
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
      license: self.license.clone(),
      created: Utc::now(),
      table: table_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default(),
      columns: VEHICLE_TABLE_HEADER,
      sources,
      config,
      report,
    }
  }
}

/// 与输出表并列写出的 JSON 描述
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
  pub title: String,
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license: Option<String>,
  pub created: DateTime<Utc>,
  pub table: String,
  pub columns: [&'static str; 8],
  pub sources: Vec<String>,
  pub config: Config,
  pub report: BatchReport,
}

impl Metadata {
  pub fn save(&self, path: &Path) -> Result<(), MetadataError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, self)?;
    info!("元数据已写入: {}", path.display());
    Ok(())
  }
}
