// 该文件是 Cheti （车体） 项目的一部分。
// src/model.rs - 车辆对象模型
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

use crate::{config::Config, geometry::GeometryError};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 输出表的列名，与 [`VehicleObject`] 的序列化顺序一致
pub const VEHICLE_TABLE_HEADER: [&str; 8] = [
  "center_x", "center_y", "length", "width", "height", "weight", "angle", "score",
];

/// 带物理属性的车辆对象，对应输出表的一行
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleObject {
  /// 来源检测记录的序号，不写入输出表
  #[serde(skip)]
  pub index: usize,
  pub center_x: f64,
  pub center_y: f64,
  pub length: f64,
  pub width: f64,
  pub height: f64,
  #[serde(rename = "weight")]
  pub mass: f64,
  #[serde(rename = "angle")]
  pub angle_degrees: f64,
  pub score: f64,
}

impl VehicleObject {
  pub fn is_finite(&self) -> bool {
    [
      self.center_x,
      self.center_y,
      self.length,
      self.width,
      self.height,
      self.mass,
      self.angle_degrees,
      self.score,
    ]
    .iter()
    .all(|v| v.is_finite())
  }
}

/// 单条检测被丢弃的原因
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DropReason {
  #[error("几何退化: {0}")]
  Degenerate(#[from] GeometryError),
  #[error("参考表中没有匹配车型")]
  NoMatch,
  #[error("置信度低于阈值")]
  BelowThreshold,
  #[error("结果包含非有限值")]
  NonFinite,
}

/// 一个批次的处理计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
  pub total: usize,
  pub kept: usize,
  pub degenerate: usize,
  pub no_match: usize,
  pub below_threshold: usize,
  pub non_finite: usize,
}

impl BatchReport {
  pub fn record(&mut self, outcome: &Result<VehicleObject, DropReason>) {
    self.total += 1;
    match outcome {
      Ok(_) => self.kept += 1,
      Err(DropReason::Degenerate(_)) => self.degenerate += 1,
      Err(DropReason::NoMatch) => self.no_match += 1,
      Err(DropReason::BelowThreshold) => self.below_threshold += 1,
      Err(DropReason::NonFinite) => self.non_finite += 1,
    }
  }

  pub fn dropped(&self) -> usize {
    self.total - self.kept
  }

  pub fn merge(&mut self, other: &BatchReport) {
    self.total += other.total;
    self.kept += other.kept;
    self.degenerate += other.degenerate;
    self.no_match += other.no_match;
    self.below_threshold += other.below_threshold;
    self.non_finite += other.non_finite;
  }
}

/// 一个来源的处理结果，行按输入顺序排列
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTable {
  pub source: String,
  pub rows: Box<[VehicleObject]>,
  pub report: BatchReport,
  /// 产生该结果时使用的配置
  pub config: Config,
}

impl AsRef<BatchReport> for VehicleTable {
  fn as_ref(&self) -> &BatchReport {
    &self.report
  }
}

impl VehicleTable {
  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }
}

mod vehicle;
pub use self::vehicle::{VehicleModel, VehicleModelBuilder};
