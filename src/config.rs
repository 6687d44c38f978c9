// 该文件是 Cheti （车体） 项目的一部分。
// src/config.rs - 运行配置
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

use serde::Serialize;
use thiserror::Error;

/// 默认置信度阈值
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.8;
/// 默认匹配容差（百分比）
pub const DEFAULT_TOLERANCE_PCT: f64 = 10.0;
/// 默认单位换算系数（检测器单位 -> 米）
pub const DEFAULT_UNIT_SCALE: f64 = 0.1;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
  #[error("单位换算系数必须为正数: {0}")]
  NonPositiveUnitScale(f64),
  #[error("匹配容差不能为负数: {0}")]
  NegativeTolerance(f64),
  #[error("置信度阈值无效: {0}")]
  InvalidScoreThreshold(f64),
}

/// 一次运行内不变的配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Config {
  /// 保留检测结果的最低置信度
  pub score_threshold: f64,
  /// 长宽匹配容差，相对于检测结果的百分比
  pub tolerance_pct: f64,
  /// 长宽的单位换算系数，中心坐标不参与换算
  pub unit_scale: f64,
  /// 是否按记录并行处理
  pub parallel: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      score_threshold: DEFAULT_SCORE_THRESHOLD,
      tolerance_pct: DEFAULT_TOLERANCE_PCT,
      unit_scale: DEFAULT_UNIT_SCALE,
      parallel: cfg!(feature = "parallel"),
    }
  }
}

impl Config {
  pub fn with_score_threshold(mut self, score_threshold: f64) -> Self {
    self.score_threshold = score_threshold;
    self
  }

  pub fn with_tolerance_pct(mut self, tolerance_pct: f64) -> Self {
    self.tolerance_pct = tolerance_pct;
    self
  }

  pub fn with_unit_scale(mut self, unit_scale: f64) -> Self {
    self.unit_scale = unit_scale;
    self
  }

  pub fn with_parallel(mut self, parallel: bool) -> Self {
    self.parallel = parallel;
    self
  }

  /// 换算系数非正时长宽会颠倒，`length >= width >= 0` 不再成立
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.unit_scale.is_finite() || self.unit_scale <= 0.0 {
      return Err(ConfigError::NonPositiveUnitScale(self.unit_scale));
    }
    if self.tolerance_pct.is_nan() || self.tolerance_pct < 0.0 {
      return Err(ConfigError::NegativeTolerance(self.tolerance_pct));
    }
    if self.score_threshold.is_nan() {
      return Err(ConfigError::InvalidScoreThreshold(self.score_threshold));
    }
    Ok(())
  }
}
