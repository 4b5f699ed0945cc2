// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/model.rs - 检测模型
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

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use crate::frame::RgbFrame;

/// 检测器：对单张图像推理，返回置信度不低于阈值的检测结果。
///
/// 结果顺序即模型输出顺序，本层不重新排序。
pub trait Detector {
  type Error;

  fn detect(
    &self,
    frame: &RgbFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<Vec<Detection>, Self::Error>;
}

impl<D: Detector + ?Sized> Detector for std::sync::Arc<D> {
  type Error = D::Error;

  fn detect(
    &self,
    frame: &RgbFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<Vec<Detection>, Self::Error> {
    (**self).detect(frame, threshold)
  }
}

/// 延迟加载时使用的模型构建器
pub trait BuildModel {
  type Model;
  type Error: std::error::Error;

  fn build(&self) -> Result<Self::Model, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  /// 标签集中的类别标识
  pub class_id: String,
  /// 模型输出中的类别索引
  pub class_index: u32,
  pub confidence: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图归一化坐标
}

#[derive(Error, Debug, PartialEq)]
pub enum ThresholdError {
  #[error("置信度阈值必须在 (0, 1] 区间内: {0}")]
  OutOfRange(f32),
  #[error("无法解析置信度阈值: {0}")]
  Parse(String),
}

/// 取值在 (0, 1] 的置信度阈值
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
  pub const DEFAULT: ConfidenceThreshold = ConfidenceThreshold(0.25);

  pub fn new(value: f32) -> Result<Self, ThresholdError> {
    if value > 0.0 && value <= 1.0 {
      Ok(Self(value))
    } else {
      Err(ThresholdError::OutOfRange(value))
    }
  }

  pub fn value(self) -> f32 {
    self.0
  }

  pub fn accepts(self, confidence: f32) -> bool {
    confidence >= self.0
  }
}

impl Default for ConfidenceThreshold {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl fmt::Display for ConfidenceThreshold {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for ConfidenceThreshold {
  type Err = ThresholdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value: f32 = s
      .trim()
      .parse()
      .map_err(|_| ThresholdError::Parse(s.to_string()))?;
    Self::new(value)
  }
}

mod labels;
pub use self::labels::{LabelError, LabelSet};

mod lazy;
pub use self::lazy::{LazyModel, LazyModelError};

pub mod postprocess;

#[cfg(feature = "model_yolo")]
mod yolo;
#[cfg(feature = "model_yolo")]
pub use self::yolo::{Yolo, YoloBuilder, YoloError};
