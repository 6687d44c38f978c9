// 该文件是 Cheti （车体） 项目的一部分。
// src/bin/bbox_to_object.rs - 检测框转车辆对象
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use cheti::{
  FromUrl,
  config::{Config, DEFAULT_SCORE_THRESHOLD, DEFAULT_TOLERANCE_PCT, DEFAULT_UNIT_SCALE},
  input::InputSources,
  model::VehicleModelBuilder,
  output::OutputWrapper,
  reference::ReferenceTable,
  task::{BatchTask, OneShotTask, Task},
};
use tracing::info;

/// Cheti 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测框来源，可重复指定（bbox:///path 或 stdin:）
  #[arg(long, value_name = "SOURCE", required = true)]
  pub input: Vec<Url>,
  /// 参考车型表（csv:///path）
  #[arg(long, value_name = "TABLE")]
  pub reference: Url,
  /// 输出路径（csv:///path 或 folder:///dir）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, env = "CHETI_SCORE_THRESHOLD", default_value_t = DEFAULT_SCORE_THRESHOLD, value_name = "THRESHOLD")]
  pub score_threshold: f64,
  /// 长宽匹配容差（百分比）
  #[arg(long, env = "CHETI_TOLERANCE_PCT", default_value_t = DEFAULT_TOLERANCE_PCT, value_name = "PERCENT")]
  pub tolerance_pct: f64,
  /// 检测器单位到米的换算系数
  #[arg(long, env = "CHETI_UNIT_SCALE", default_value_t = DEFAULT_UNIT_SCALE, value_parser = positive_f64, value_name = "SCALE")]
  pub unit_scale: f64,
  /// 是否按记录并行处理
  #[arg(long, env = "CHETI_PARALLEL", default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
  pub parallel: bool,

  /// 只处理第一个来源
  #[arg(long)]
  pub first_only: bool,
  /// 最多处理的来源数量
  #[arg(long, value_name = "COUNT")]
  pub max_sources: Option<usize>,

  /// 元数据标题
  #[arg(long, value_name = "TITLE")]
  pub title: Option<String>,
  /// 元数据许可证
  #[arg(long, value_name = "LICENSE")]
  pub license: Option<String>,
}

fn positive_f64(s: &str) -> Result<f64, String> {
  let value: f64 = s.parse().map_err(|e| format!("无效的数值 '{}': {}", s, e))?;
  if value.is_finite() && value > 0.0 {
    Ok(value)
  } else {
    Err(format!("必须为正数, 实际为 {}", value))
  }
}

impl Args {
  fn config(&self) -> Config {
    Config::default()
      .with_score_threshold(self.score_threshold)
      .with_tolerance_pct(self.tolerance_pct)
      .with_unit_scale(self.unit_scale)
      .with_parallel(self.parallel)
  }

  /// 命令行给出的元数据字段并入输出 URL 的查询参数
  fn output_url(&self) -> Url {
    let mut url = self.output.clone();
    if self.title.is_some() || self.license.is_some() {
      let mut query = url.query_pairs_mut();
      if let Some(title) = &self.title {
        query.append_pair("title", title);
      }
      if let Some(license) = &self.license {
        query.append_pair("license", license);
      }
    }
    url
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = args.config();
  let output_url = args.output_url();

  for input in &args.input {
    info!("输入来源: {}", input);
  }
  info!("参考车型表: {}", args.reference);
  info!("输出路径: {}", output_url);

  config.validate()?;

  let inputs = InputSources::new(args.input.iter().cloned());
  let table = ReferenceTable::from_url(&args.reference)?;
  let model = VehicleModelBuilder::new(table).config(config).build();
  let output = OutputWrapper::from_url(&output_url)?;

  let report = if args.first_only {
    OneShotTask.run_task(inputs, model, output)?
  } else {
    BatchTask::default()
      .with_source_limit(args.max_sources)
      .run_task(inputs, model, output)?
  };

  info!("保留 {} / {} 个车辆对象", report.kept, report.total);

  Ok(())
}
