// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/model/yolo.rs - 基于 ONNX 的 YOLO 检测模型
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

use std::{path::PathBuf, time::Instant};

use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  model::{
    BuildModel, ConfidenceThreshold, Detection, Detector, LabelError, LabelSet,
    postprocess::{self, PostprocessError, PostprocessParams},
  },
  url_file_path, url_query,
};

const YOLO_DEFAULT_INPUT_SIZE: u32 = 640;
const YOLO_LABELS_SUFFIX: &str = "labels.txt";

type YoloPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

#[derive(Error, Debug)]
pub enum YoloError {
  #[error("模型文件不存在或不可读: {0}")]
  CheckpointMissing(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("标签错误: {0}")]
  Label(#[from] LabelError),
  #[error("后处理错误: {0}")]
  Postprocess(#[from] PostprocessError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl YoloError {
  fn invalid(msg: &str, e: impl std::fmt::Display) -> Self {
    YoloError::ModelInvalid(format!("{msg}: {e}"))
  }
}

/// YOLO 模型构建参数，`from_url` 时即检查模型与标签文件
#[derive(Debug, Clone)]
pub struct YoloBuilder {
  model_path: PathBuf,
  labels: LabelSet,
  input_size: u32,
  iou_threshold: f32,
  max_det: usize,
}

impl FromUrlWithScheme for YoloBuilder {
  const SCHEME: &'static str = "yolo";
}

impl FromUrl for YoloBuilder {
  type Error = YoloError;

  /// `yolo:///path/model.onnx?labels=/path/labels.txt&size=640&iou=0.7&max_det=300`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let model_path = PathBuf::from(url_file_path(url));
    let labels_path = match url_query(url, "labels") {
      Some(path) => PathBuf::from(path),
      None => model_path.with_extension(YOLO_LABELS_SUFFIX),
    };

    let mut builder = YoloBuilder::new(model_path, LabelSet::load(&labels_path)?)?;
    if let Some(size) = url_query(url, "size") {
      builder = builder.input_size(parse_param("size", &size)?);
    }
    if let Some(iou) = url_query(url, "iou") {
      builder = builder.iou_threshold(parse_param("iou", &iou)?);
    }
    if let Some(max_det) = url_query(url, "max_det") {
      builder = builder.max_det(parse_param("max_det", &max_det)?);
    }
    builder.validate()
  }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, YoloError> {
  value
    .parse()
    .map_err(|_| YoloError::ModelPathError(format!("参数 {key} 无效: {value}")))
}

impl YoloBuilder {
  pub fn new(model_path: impl Into<PathBuf>, labels: LabelSet) -> Result<Self, YoloError> {
    let model_path = model_path.into();
    match std::fs::metadata(&model_path) {
      Ok(meta) if meta.is_file() => {}
      _ => {
        error!("模型文件不存在: {}", model_path.display());
        return Err(YoloError::CheckpointMissing(
          model_path.display().to_string(),
        ));
      }
    }

    Ok(Self {
      model_path,
      labels,
      input_size: YOLO_DEFAULT_INPUT_SIZE,
      iou_threshold: postprocess::DEFAULT_IOU_THRESHOLD,
      max_det: postprocess::DEFAULT_MAX_DETECTIONS,
    })
  }

  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn iou_threshold(mut self, iou: f32) -> Self {
    self.iou_threshold = iou;
    self
  }

  pub fn max_det(mut self, max_det: usize) -> Self {
    self.max_det = max_det;
    self
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  /// 输入尺寸必须为正，IoU 阈值必须在 (0, 1] 内
  pub fn validate(self) -> Result<Self, YoloError> {
    if self.input_size == 0 {
      return Err(YoloError::ModelPathError("参数 size 必须大于 0".to_string()));
    }
    if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
      return Err(YoloError::ModelPathError(format!(
        "参数 iou 必须在 (0, 1] 内: {}",
        self.iou_threshold
      )));
    }
    Ok(self)
  }
}

impl BuildModel for YoloBuilder {
  type Model = Yolo;
  type Error = YoloError;

  fn build(&self) -> Result<Yolo, YoloError> {
    info!("加载模型文件: {}", self.model_path.display());
    let size = self.input_size as usize;

    let plan = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .map_err(|e| YoloError::invalid("无法解析 ONNX 模型", e))?
      .with_input_fact(0, f32::fact([1, 3, size, size]).into())
      .map_err(|e| YoloError::invalid("无法设置输入形状", e))?
      .into_optimized()
      .map_err(|e| YoloError::invalid("模型优化失败", e))?
      .into_runnable()
      .map_err(|e| YoloError::invalid("无法创建推理计划", e))?;

    debug!(
      "模型输入: 1x3x{}x{}, 类别数: {}",
      size,
      size,
      self.labels.len()
    );

    Ok(Yolo {
      plan,
      labels: self.labels.clone(),
      input_size: self.input_size,
      iou_threshold: self.iou_threshold,
      max_det: self.max_det,
    })
  }
}

pub struct Yolo {
  plan: YoloPlan,
  labels: LabelSet,
  input_size: u32,
  iou_threshold: f32,
  max_det: usize,
}

impl Detector for Yolo {
  type Error = YoloError;

  fn detect(
    &self,
    frame: &RgbFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<Vec<Detection>, Self::Error> {
    let size = self.input_size as usize;

    debug!("预处理输入图像 {}x{}", frame.width(), frame.height());
    let (data, letterbox) = frame.letterbox_nchw(self.input_size);
    let input = Tensor::from_shape(&[1, 3, size, size], &data)
      .map_err(|e| YoloError::Inference(e.to_string()))?;

    debug!("执行模型推理");
    let now = Instant::now();
    let outputs = self
      .plan
      .run(tvec!(input.into()))
      .map_err(|e| YoloError::Inference(e.to_string()))?;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    let output = outputs
      .first()
      .ok_or_else(|| YoloError::Inference("模型没有输出".to_string()))?;
    let shape = output.shape().to_vec();
    let values = output
      .as_slice::<f32>()
      .map_err(|e| YoloError::Inference(e.to_string()))?;
    debug!("模型输出形状: {:?}", shape);

    let params = PostprocessParams {
      threshold,
      iou_threshold: self.iou_threshold,
      max_det: self.max_det,
    };
    let detections = postprocess::postprocess(values, &shape, &letterbox, &self.labels, params)?;
    debug!("检测到 {} 个物体", detections.len());

    Ok(detections)
  }
}
