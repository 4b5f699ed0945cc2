// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/model/lazy.rs - 首次使用时加载、此后复用的模型
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

use std::{fmt::Display, sync::Arc, time::Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

use crate::{
  frame::RgbFrame,
  model::{BuildModel, ConfidenceThreshold, Detection, Detector},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LazyModelError {
  #[error("模型加载失败: {0}")]
  Load(String),
  #[error("模型此前加载失败，不再重试: {0}")]
  Unavailable(String),
  #[error("推理失败: {0}")]
  Inference(String),
}

enum LoadState<M> {
  Pending,
  Ready(Arc<M>),
  Failed(String),
}

/// 持有构建器，在第一次调用时加载模型并缓存。
///
/// 加载在互斥锁内完成，并发的首次调用只会触发一次加载；
/// 加载失败同样被缓存，之后的调用直接返回错误。
pub struct LazyModel<B: BuildModel> {
  builder: B,
  state: Mutex<LoadState<B::Model>>,
}

impl<B: BuildModel> LazyModel<B> {
  pub fn new(builder: B) -> Self {
    Self {
      builder,
      state: Mutex::new(LoadState::Pending),
    }
  }

  pub fn get(&self) -> Result<Arc<B::Model>, LazyModelError> {
    let mut state = self.state.lock();
    match &*state {
      LoadState::Ready(model) => return Ok(Arc::clone(model)),
      LoadState::Failed(reason) => return Err(LazyModelError::Unavailable(reason.clone())),
      LoadState::Pending => {}
    }

    info!("首次使用，开始加载模型...");
    let now = Instant::now();
    match self.builder.build() {
      Ok(model) => {
        let model = Arc::new(model);
        *state = LoadState::Ready(Arc::clone(&model));
        info!("模型加载完成，耗时: {:.2?}", now.elapsed());
        Ok(model)
      }
      Err(e) => {
        let reason = e.to_string();
        error!("模型加载失败: {}", reason);
        *state = LoadState::Failed(reason.clone());
        Err(LazyModelError::Load(reason))
      }
    }
  }

  pub fn is_loaded(&self) -> bool {
    matches!(&*self.state.lock(), LoadState::Ready(_))
  }
}

impl<B> Detector for LazyModel<B>
where
  B: BuildModel,
  B::Model: Detector,
  <B::Model as Detector>::Error: Display,
{
  type Error = LazyModelError;

  fn detect(
    &self,
    frame: &RgbFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<Vec<Detection>, Self::Error> {
    let model = self.get()?;
    model
      .detect(frame, threshold)
      .map_err(|e| LazyModelError::Inference(e.to_string()))
  }
}
