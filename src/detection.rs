// 该文件是 Cheti （车体） 项目的一部分。
// src/detection.rs - 检测记录定义与解析
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

use thiserror::Error;
use tracing::debug;

use crate::geometry::Quad;

/// 每条检测记录的数值个数：4 个角点 (x, y) 与置信度
pub const VALUES_PER_DETECTION: usize = 9;

#[derive(Error, Debug)]
pub enum MalformedInputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("第 {position} 个数值无法解析: {token:?}")]
  InvalidNumber { position: usize, token: String },
  #[error("数值总数 {count} 不能被 {} 整除", VALUES_PER_DETECTION)]
  Malformed { count: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 在来源文件中的序号，从 0 开始
  pub index: usize,
  pub quad: Quad,
  pub score: f64,
}

impl Detection {
  pub fn from_values(index: usize, values: &[f64; VALUES_PER_DETECTION]) -> Self {
    let mut corners = [0.0; 8];
    corners.copy_from_slice(&values[..8]);
    Detection {
      index,
      quad: Quad::from(corners),
      score: values[8],
    }
  }
}

/// 单个来源文件中的全部检测记录
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBatch {
  pub source: String,
  pub detections: Box<[Detection]>,
}

impl DetectionBatch {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }

  pub fn len(&self) -> usize {
    self.detections.len()
  }

  /// 解析空白分隔的浮点数流，每 9 个数值组成一条记录
  pub fn parse(source: impl Into<String>, text: &str) -> Result<Self, MalformedInputError> {
    let values = text
      .split_whitespace()
      .enumerate()
      .map(|(position, token)| {
        token
          .parse::<f64>()
          .map_err(|_| MalformedInputError::InvalidNumber {
            position,
            token: token.to_string(),
          })
      })
      .collect::<Result<Vec<_>, _>>()?;

    if values.len() % VALUES_PER_DETECTION != 0 {
      return Err(MalformedInputError::Malformed {
        count: values.len(),
      });
    }

    let detections = values
      .chunks_exact(VALUES_PER_DETECTION)
      .enumerate()
      .map(|(index, chunk)| {
        let mut record = [0.0; VALUES_PER_DETECTION];
        record.copy_from_slice(chunk);
        Detection::from_values(index, &record)
      })
      .collect::<Vec<_>>();

    let source = source.into();
    debug!("{}: 解析得到 {} 条检测记录", source, detections.len());

    Ok(DetectionBatch {
      source,
      detections: detections.into_boxed_slice(),
    })
  }

  pub fn from_reader<R: Read>(
    source: impl Into<String>,
    mut reader: R,
  ) -> Result<Self, MalformedInputError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Self::parse(source, &text)
  }
}
