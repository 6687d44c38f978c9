// 该文件是 Cheti （车体） 项目的一部分。
// src/input/stdin.rs - 标准输入
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

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectionBatch,
  input::bbox_file::BboxFileInputError,
};

const STDIN_SOURCE_NAME: &str = "stdin";

/// 从标准输入读取一个批次，供外部程序通过管道喂入
pub struct StdinInput {
  batch: Option<DetectionBatch>,
}

impl FromUrlWithScheme for StdinInput {
  const SCHEME: &'static str = "stdin";
}

impl FromUrl for StdinInput {
  type Error = BboxFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(BboxFileInputError::SchemaMismatch);
    }

    info!("从标准输入读取检测框");
    let batch = DetectionBatch::from_reader(STDIN_SOURCE_NAME, std::io::stdin().lock())?;
    info!("标准输入: 共 {} 条检测记录", batch.len());
    Ok(StdinInput { batch: Some(batch) })
  }
}

impl Iterator for StdinInput {
  type Item = DetectionBatch;

  fn next(&mut self) -> Option<Self::Item> {
    self.batch.take()
  }
}
