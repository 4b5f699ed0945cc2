// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/task.rs - 单张图像识别任务
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

use tracing::info;

use crate::{
  frame::RgbFrame,
  model::{ConfidenceThreshold, Detector},
  nutrition::NutritionResolver,
  output::Render,
  pipeline::FoodPipeline,
  result::ResolvedResult,
};

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: &P, output: O) -> Result<ResolvedResult, Self::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OneShotTask {
  threshold: ConfidenceThreshold,
}

impl OneShotTask {
  pub fn with_threshold(mut self, threshold: ConfidenceThreshold) -> Self {
    self.threshold = threshold;
    self
  }
}

impl<D, R, I, O, DE, RE> Task<I, FoodPipeline<D, R>, O> for OneShotTask
where
  D: Detector<Error = DE>,
  DE: std::error::Error + Sync + Send + 'static,
  R: NutritionResolver,
  I: Iterator<Item = RgbFrame>,
  O: Render<RgbFrame, ResolvedResult, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: &FoodPipeline<D, R>,
    output: O,
  ) -> Result<ResolvedResult, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始识别...");
    let now = std::time::Instant::now();
    let result = pipeline.resolve(&frame, self.threshold)?;
    info!("识别完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("输出完成");

    Ok(result)
  }
}
