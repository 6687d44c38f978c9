// 该文件是 Cheti （车体） 项目的一部分。
// src/model/vehicle.rs - 检测框到车辆对象的逐条转换
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

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
  config::Config,
  detection::{Detection, DetectionBatch},
  model::{BatchReport, DropReason, Model, VehicleObject, VehicleTable},
  reference::ReferenceTable,
};

pub struct VehicleModel {
  table: Arc<ReferenceTable>,
  config: Config,
}

pub struct VehicleModelBuilder {
  table: Arc<ReferenceTable>,
  config: Config,
}

impl VehicleModelBuilder {
  pub fn new(table: impl Into<Arc<ReferenceTable>>) -> Self {
    VehicleModelBuilder {
      table: table.into(),
      config: Config::default(),
    }
  }

  pub fn config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  pub fn build(self) -> VehicleModel {
    info!(
      "参考车型 {} 行, 置信度阈值 {}, 容差 {}%, 单位系数 {}, 并行 {}",
      self.table.len(),
      self.config.score_threshold,
      self.config.tolerance_pct,
      self.config.unit_scale,
      self.config.parallel
    );
    VehicleModel {
      table: self.table,
      config: self.config,
    }
  }
}

impl VehicleModel {
  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn table(&self) -> &ReferenceTable {
    &self.table
  }

  /// 处理单条检测：几何提取、属性匹配、阈值过滤、有限值检查
  pub fn process(&self, detection: &Detection) -> Result<VehicleObject, DropReason> {
    let rect = detection.quad.oriented_rect(self.config.unit_scale)?;

    let attrs = self
      .table
      .match_attributes(rect.length, rect.width, self.config.tolerance_pct)
      .ok_or(DropReason::NoMatch)?;

    if detection.score < self.config.score_threshold {
      return Err(DropReason::BelowThreshold);
    }

    let object = VehicleObject {
      index: detection.index,
      center_x: rect.center_x,
      center_y: rect.center_y,
      length: rect.length,
      width: rect.width,
      height: attrs.height,
      mass: attrs.mass,
      angle_degrees: rect.angle_degrees,
      score: detection.score,
    };

    if !object.is_finite() {
      return Err(DropReason::NonFinite);
    }

    Ok(object)
  }

  #[cfg(feature = "parallel")]
  fn process_all(&self, detections: &[Detection]) -> Vec<Result<VehicleObject, DropReason>> {
    use rayon::prelude::*;

    if self.config.parallel {
      // 索引迭代器的 collect 保持输入顺序
      detections.par_iter().map(|d| self.process(d)).collect()
    } else {
      detections.iter().map(|d| self.process(d)).collect()
    }
  }

  #[cfg(not(feature = "parallel"))]
  fn process_all(&self, detections: &[Detection]) -> Vec<Result<VehicleObject, DropReason>> {
    detections.iter().map(|d| self.process(d)).collect()
  }
}

impl Model for VehicleModel {
  type Input = DetectionBatch;
  type Output = VehicleTable;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("{}: 处理 {} 条检测记录", input.source, input.len());

    let mut report = BatchReport::default();
    let mut rows = Vec::new();
    for (detection, outcome) in input.detections.iter().zip(self.process_all(&input.detections)) {
      report.record(&outcome);
      match outcome {
        Ok(object) => rows.push(object),
        Err(reason) => debug!("{}: 丢弃第 {} 条检测: {}", input.source, detection.index, reason),
      }
    }

    info!(
      "{}: 共 {} 条, 保留 {}, 退化 {}, 无匹配 {}, 低置信度 {}, 非有限值 {}",
      input.source,
      report.total,
      report.kept,
      report.degenerate,
      report.no_match,
      report.below_threshold,
      report.non_finite
    );

    Ok(VehicleTable {
      source: input.source.clone(),
      rows: rows.into_boxed_slice(),
      report,
      config: self.config,
    })
  }
}
