// 该文件是 Cheti （车体） 项目的一部分。
// src/task.rs - 批处理任务
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

use std::time::Instant;
use tracing::{info, warn};

use crate::{model::BatchReport, model::Model, output::Render};

/// 输入来源逐个产出 `Result`，打开或解析失败的来源在被处理到时才报错
pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 只处理第一个来源
pub struct OneShotTask;

impl<
  F,
  D: AsRef<BatchReport>,
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = BatchReport;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let batch = input.next().ok_or_else(|| anyhow::anyhow!("没有输入来源"))??;
    let now = Instant::now();
    let result = model.infer(&batch)?;
    let elapsed = now.elapsed();
    info!("处理完成，耗时: {:.2?}", elapsed);
    output.render_result(&batch, &result)?;
    info!("写出完成，耗时: {:.2?}", now.elapsed());

    Ok(*result.as_ref())
  }
}

/// 依次处理所有来源，可限制来源数量
#[derive(Default, Debug)]
pub struct BatchTask {
  source_limit: Option<usize>,
}

impl BatchTask {
  pub fn with_source_limit(mut self, source_limit: Option<usize>) -> Self {
    self.source_limit = source_limit;
    self
  }
}

impl<
  F,
  D: AsRef<BatchReport>,
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for BatchTask
{
  type Output = BatchReport;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let mut total = BatchReport::default();
    let mut source_index = 0;
    let started = Instant::now();
    loop {
      // 先检查数量限制，超出限制的来源不会被打开
      if self.source_limit.map(|n| source_index >= n).unwrap_or(false) {
        info!("达到指定来源数量 {}, 退出任务循环", source_index);
        break;
      }
      let Some(batch) = input.next() else {
        break;
      };
      let batch = batch?;
      source_index += 1;
      info!("处理第 {} 个来源", source_index);

      let now = Instant::now();
      let result = model.infer(&batch)?;
      let elapsed_a = now.elapsed();
      output.render_result(&batch, &result)?;
      let elapsed_b = now.elapsed();
      info!("处理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);

      total.merge(result.as_ref());
    }

    if source_index == 0 {
      warn!("没有任何输入来源");
    }

    info!(
      "任务完成: {} 个来源, 共 {} 条检测, 保留 {}, 丢弃 {}, 总耗时 {:.2?}",
      source_index,
      total.total,
      total.kept,
      total.dropped(),
      started.elapsed()
    );
    Ok(total)
  }
}
