// 该文件是 Cheti （车体） 项目的一部分。
// src/input/bbox_file.rs - 检测框文件输入
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
use std::io::BufReader;

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{DetectionBatch, MalformedInputError},
  url_path,
};

#[derive(Error, Debug)]
pub enum BboxFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测框文件格式错误: {0}")]
  MalformedInput(#[from] MalformedInputError),
}

/// 空白分隔的检测框文件，整个文件作为一个批次
pub struct BboxFileInput {
  batch: Option<DetectionBatch>,
}

impl FromUrlWithScheme for BboxFileInput {
  const SCHEME: &'static str = "bbox";
}

impl FromUrl for BboxFileInput {
  type Error = BboxFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(BboxFileInputError::SchemaMismatch);
    }

    let path = url_path(url);
    info!("读取检测框文件: {}", path.display());
    let reader = BufReader::new(File::open(&path)?);
    let batch = DetectionBatch::from_reader(path.display().to_string(), reader)?;
    info!("{}: 共 {} 条检测记录", batch.source, batch.len());

    Ok(BboxFileInput { batch: Some(batch) })
  }
}

impl From<DetectionBatch> for BboxFileInput {
  fn from(batch: DetectionBatch) -> Self {
    BboxFileInput { batch: Some(batch) }
  }
}

impl Iterator for BboxFileInput {
  type Item = DetectionBatch;

  fn next(&mut self) -> Option<Self::Item> {
    self.batch.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yields_single_batch() {
    let batch = DetectionBatch::parse("mem", "0 0 1 0 1 1 0 1 0.9").unwrap();
    let mut input = BboxFileInput::from(batch);
    assert_eq!(input.next().map(|b| b.len()), Some(1));
    assert!(input.next().is_none());
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("csv:///tmp/boxes.txt").unwrap();
    assert!(matches!(
      BboxFileInput::from_url(&url),
      Err(BboxFileInputError::SchemaMismatch)
    ));
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("bbox:///nonexistent/cheti/BboxAndScore_4.txt").unwrap();
    assert!(matches!(
      BboxFileInput::from_url(&url),
      Err(BboxFileInputError::IoError(_))
    ));
  }
}
