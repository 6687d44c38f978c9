// 该文件是 Cheti （车体） 项目的一部分。
// src/input.rs - 检测框输入
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

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, detection::DetectionBatch};

mod bbox_file;
pub use self::bbox_file::{BboxFileInput, BboxFileInputError};

mod stdin;
pub use self::stdin::StdinInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Bbox file input error: {0}")]
  BboxFileInputError(#[from] BboxFileInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  BboxFile(BboxFileInput),
  Stdin(StdinInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      BboxFileInput::SCHEME => Ok(InputWrapper::BboxFile(BboxFileInput::from_url(url)?)),
      StdinInput::SCHEME => Ok(InputWrapper::Stdin(StdinInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = DetectionBatch;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::BboxFile(input) => input.next(),
      InputWrapper::Stdin(input) => input.next(),
    }
  }
}

/// 按顺序打开一组来源 URL
///
/// 每个来源在迭代到它时才读取，失败时产出 `Err`，后续来源不受影响。
pub struct InputSources {
  urls: std::vec::IntoIter<Url>,
  current: Option<InputWrapper>,
}

impl InputSources {
  pub fn new(urls: impl IntoIterator<Item = Url>) -> Self {
    InputSources {
      urls: urls.into_iter().collect::<Vec<_>>().into_iter(),
      current: None,
    }
  }
}

impl Iterator for InputSources {
  type Item = Result<DetectionBatch, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(batch) = self.current.as_mut().and_then(Iterator::next) {
        return Some(Ok(batch));
      }
      self.current = None;

      let url = self.urls.next()?;
      info!("打开输入来源: {}", url);
      match InputWrapper::from_url(&url) {
        Ok(input) => self.current = Some(input),
        Err(e) => {
          error!("无法打开输入来源 {}: {}", url, e);
          return Some(Err(e));
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_reported_when_reached() {
    let urls = vec![
      Url::parse("bbox:///nonexistent/cheti/boxes.txt").unwrap(),
      Url::parse("http://example.com/boxes.txt").unwrap(),
    ];
    let mut sources = InputSources::new(urls);
    assert!(matches!(
      sources.next(),
      Some(Err(InputError::BboxFileInputError(BboxFileInputError::IoError(_))))
    ));
    assert!(matches!(sources.next(), Some(Err(InputError::SchemeMismatch))));
    assert!(sources.next().is_none());
  }

  #[test]
  fn empty_url_list_yields_nothing() {
    assert!(InputSources::new(Vec::new()).next().is_none());
  }
}
