// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/pipeline.rs - 检测、查表、合成的完整流程
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

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::RgbFrame,
  input::{UploadError, decode_upload},
  model::{ConfidenceThreshold, Detector},
  nutrition::NutritionResolver,
  result::{ResolvedResult, assemble},
};

#[derive(Error, Debug)]
pub enum PipelineError<E> {
  #[error("检测失败: {0}")]
  Detect(E),
  #[error("上传图像无效: {0}")]
  Upload(#[from] UploadError),
}

/// 启动时构建一次，按引用传给各请求处理方。
///
/// 检测器与营养表在构建后只读，可在多个调用方之间共享。
pub struct FoodPipeline<D, R> {
  detector: D,
  resolver: R,
}

impl<D, R> FoodPipeline<D, R>
where
  D: Detector,
  R: NutritionResolver,
{
  pub fn new(detector: D, resolver: R) -> Self {
    Self { detector, resolver }
  }

  pub fn detector(&self) -> &D {
    &self.detector
  }

  pub fn resolver(&self) -> &R {
    &self.resolver
  }

  pub fn resolve(
    &self,
    frame: &RgbFrame,
    threshold: ConfidenceThreshold,
  ) -> Result<ResolvedResult, PipelineError<D::Error>> {
    let now = Instant::now();
    let detections = self
      .detector
      .detect(frame, threshold)
      .map_err(PipelineError::Detect)?;
    debug!(
      "检测到 {} 个候选结果，耗时: {:.2?}",
      detections.len(),
      now.elapsed()
    );

    let result = assemble(&detections, &self.resolver);
    match (&result.class_id, result.confidence) {
      (Some(class_id), Some(confidence)) => {
        info!("识别结果: {} ({:.3})", class_id, confidence)
      }
      _ => info!("未识别到菜品 (阈值 {})", threshold),
    }

    Ok(result)
  }

  /// 解码上传的 JPEG/PNG 字节后运行完整流程
  pub fn resolve_upload(
    &self,
    bytes: &[u8],
    threshold: ConfidenceThreshold,
  ) -> Result<ResolvedResult, PipelineError<D::Error>> {
    let frame = decode_upload(bytes)?;
    self.resolve(&frame, threshold)
  }
}

#[cfg(feature = "model_yolo")]
mod yolo_pipeline {
  use thiserror::Error;
  use url::Url;

  use super::FoodPipeline;
  use crate::{
    FromUrl,
    model::{LazyModel, YoloBuilder, YoloError},
    nutrition::{NutritionError, NutritionTable},
  };

  pub type YoloPipeline = FoodPipeline<LazyModel<YoloBuilder>, NutritionTable>;

  #[derive(Error, Debug)]
  pub enum StartupError {
    #[error("模型配置错误: {0}")]
    Model(#[from] YoloError),
    #[error("营养数据错误: {0}")]
    Nutrition(#[from] NutritionError),
  }

  impl YoloPipeline {
    /// 校验模型与营养表，二者任一缺失即为启动失败；模型图在首次推理时加载
    pub fn from_urls(model: &Url, nutrition: &Url) -> Result<Self, StartupError> {
      let builder = YoloBuilder::from_url(model)?;
      let table = NutritionTable::from_url(nutrition)?;
      Ok(FoodPipeline::new(LazyModel::new(builder), table))
    }
  }
}

#[cfg(feature = "model_yolo")]
pub use self::yolo_pipeline::{StartupError, YoloPipeline};

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    model::Detection,
    nutrition::NutritionTable,
    result::FactValue,
  };
  use image::{ImageFormat, Rgb, RgbImage};
  use std::io::Cursor;

  #[derive(Debug, PartialEq)]
  struct Offline;

  impl std::fmt::Display for Offline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str("offline")
    }
  }

  struct Scripted(Vec<Detection>);

  impl Detector for Scripted {
    type Error = Offline;

    fn detect(
      &self,
      _frame: &RgbFrame,
      threshold: ConfidenceThreshold,
    ) -> Result<Vec<Detection>, Self::Error> {
      Ok(
        self
          .0
          .iter()
          .filter(|d| threshold.accepts(d.confidence))
          .cloned()
          .collect(),
      )
    }
  }

  struct Broken;

  impl Detector for Broken {
    type Error = Offline;

    fn detect(&self, _: &RgbFrame, _: ConfidenceThreshold) -> Result<Vec<Detection>, Offline> {
      Err(Offline)
    }
  }

  fn table() -> NutritionTable {
    NutritionTable::from_json_str(r#"{"pho_bo": {"display_name": "Pho Bo", "calories": 450}}"#)
      .unwrap()
  }

  fn pho(confidence: f32) -> Detection {
    Detection {
      class_id: "pho_bo".to_string(),
      class_index: 0,
      confidence,
      bbox: [0.1, 0.1, 0.9, 0.9],
    }
  }

  fn png() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]))
      .write_to(&mut buf, ImageFormat::Png)
      .unwrap();
    buf.into_inner()
  }

  #[test]
  fn resolves_top_detection() {
    let pipeline = FoodPipeline::new(Scripted(vec![pho(0.87)]), table());
    let frame = RgbFrame::from(RgbImage::new(4, 4));
    let result = pipeline.resolve(&frame, ConfidenceThreshold::DEFAULT).unwrap();
    assert_eq!(result.display_label, "Pho Bo");
    assert_eq!(result.confidence_text, "87.0%");
    assert_eq!(result.nutrition_facts.calories, FactValue::Amount(450.0));
    assert_eq!(pipeline.resolver().len(), 1);
  }

  #[test]
  fn below_threshold_is_soft_no_result() {
    let pipeline = FoodPipeline::new(Scripted(vec![pho(0.3)]), table());
    let threshold = ConfidenceThreshold::new(0.5).unwrap();
    let result = pipeline.resolve_upload(&png(), threshold).unwrap();
    assert_eq!(result, ResolvedResult::no_detection());
  }

  #[test]
  fn detector_failure_is_reported() {
    let pipeline = FoodPipeline::new(Broken, table());
    let err = pipeline
      .resolve_upload(&png(), ConfidenceThreshold::DEFAULT)
      .unwrap_err();
    assert!(matches!(err, PipelineError::Detect(Offline)));
  }

  #[test]
  fn bad_upload_is_rejected() {
    let pipeline = FoodPipeline::new(Scripted(vec![]), table());
    let err = pipeline
      .resolve_upload(b"GIF89a....", ConfidenceThreshold::DEFAULT)
      .unwrap_err();
    assert!(matches!(err, PipelineError::Upload(UploadError::UnsupportedFormat(_))));
  }
}
