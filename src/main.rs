// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 FoodLens 项目贡献者

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use foodlens::{
  FromUrl,
  input::InputWrapper,
  output::OutputWrapper,
  pipeline::YoloPipeline,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型地址: {}", args.model);
  info!("营养数据: {}", args.nutrition);
  info!("输入来源: {}", args.input);
  info!("输出方式: {}", args.output);
  info!("置信度阈值: {}", args.confidence);

  let pipeline = YoloPipeline::from_urls(&args.model, &args.nutrition)?;
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let result = OneShotTask::default()
    .with_threshold(args.confidence)
    .run_task(input, &pipeline, output)?;

  if !result.is_detected() {
    info!("图像中未识别到菜品");
  }

  Ok(())
}
