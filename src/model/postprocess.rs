// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/model/postprocess.rs - YOLO 输出解码与非极大值抑制
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

use thiserror::Error;
use tracing::debug;

use crate::{
  frame::Letterbox,
  model::{ConfidenceThreshold, Detection, LabelSet},
};

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

const BOX_FEATURES: usize = 4;

#[derive(Error, Debug, PartialEq)]
pub enum PostprocessError {
  #[error("输出张量形状不支持: {0:?}")]
  UnsupportedShape(Vec<usize>),
  #[error("输出张量长度 {actual} 与形状不符，期望 {expected}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 模型输入空间中的候选框，bbox 为 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub class_index: u32,
  pub confidence: f32,
  pub bbox: [f32; 4],
}

/// 原始输出的排布：特征在前 `[4+nc, N]` 或锚点在前 `[N, 4+nc]`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Layout {
  features: usize,
  anchors: usize,
  features_first: bool,
}

impl Layout {
  fn from_shape(shape: &[usize]) -> Result<Self, PostprocessError> {
    let (a, b) = match shape {
      [1, a, b] | [a, b] => (*a, *b),
      _ => return Err(PostprocessError::UnsupportedShape(shape.to_vec())),
    };

    // 类别数远小于锚点数，较小的一维即特征维
    let (features, anchors, features_first) = if a <= b { (a, b, true) } else { (b, a, false) };
    if features <= BOX_FEATURES {
      return Err(PostprocessError::UnsupportedShape(shape.to_vec()));
    }

    Ok(Self {
      features,
      anchors,
      features_first,
    })
  }

  fn at(&self, data: &[f32], anchor: usize, feature: usize) -> f32 {
    if self.features_first {
      data[feature * self.anchors + anchor]
    } else {
      data[anchor * self.features + feature]
    }
  }
}

/// 解码原始输出，丢弃低于阈值、非有限值与退化的框
pub fn decode(
  data: &[f32],
  shape: &[usize],
  threshold: ConfidenceThreshold,
) -> Result<Vec<Candidate>, PostprocessError> {
  let layout = Layout::from_shape(shape)?;
  let expected = layout.features * layout.anchors;
  if data.len() != expected {
    return Err(PostprocessError::LengthMismatch {
      expected,
      actual: data.len(),
    });
  }

  let num_classes = layout.features - BOX_FEATURES;
  let mut candidates = Vec::new();

  for anchor in 0..layout.anchors {
    let (class_index, score) = (0..num_classes)
      .map(|c| (c, layout.at(data, anchor, BOX_FEATURES + c)))
      .fold((0usize, f32::NEG_INFINITY), |best, (c, s)| {
        if s > best.1 { (c, s) } else { best }
      });

    if !score.is_finite() || !threshold.accepts(score) {
      continue;
    }

    let cx = layout.at(data, anchor, 0);
    let cy = layout.at(data, anchor, 1);
    let w = layout.at(data, anchor, 2);
    let h = layout.at(data, anchor, 3);
    if ![cx, cy, w, h].iter().all(|v| v.is_finite()) || w <= 0.0 || h <= 0.0 {
      continue;
    }

    candidates.push(Candidate {
      class_index: class_index as u32,
      confidence: score,
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  Ok(candidates)
}

/// 计算两个框的 IoU
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

/// 按类别的非极大值抑制，结果按置信度降序，最多保留 `max_det` 个
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32, max_det: usize) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut kept: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    if kept.len() >= max_det {
      break;
    }
    let suppressed = kept.iter().any(|k| {
      k.class_index == candidate.class_index && iou(&k.bbox, &candidate.bbox) > iou_threshold
    });
    if !suppressed {
      kept.push(candidate);
    }
  }

  kept
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessParams {
  pub threshold: ConfidenceThreshold,
  pub iou_threshold: f32,
  pub max_det: usize,
}

impl Default for PostprocessParams {
  fn default() -> Self {
    Self {
      threshold: ConfidenceThreshold::DEFAULT,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      max_det: DEFAULT_MAX_DETECTIONS,
    }
  }
}

/// 解码、抑制并映射回原图坐标
pub fn postprocess(
  data: &[f32],
  shape: &[usize],
  letterbox: &Letterbox,
  labels: &LabelSet,
  params: PostprocessParams,
) -> Result<Vec<Detection>, PostprocessError> {
  let candidates = decode(data, shape, params.threshold)?;
  let before = candidates.len();
  let kept = nms(candidates, params.iou_threshold, params.max_det);
  debug!("NMS 前 {} 个候选框，保留 {} 个", before, kept.len());

  Ok(
    kept
      .into_iter()
      .map(|c| Detection {
        class_id: labels.class_id(c.class_index),
        class_index: c.class_index,
        confidence: c.confidence,
        bbox: letterbox.unmap(c.bbox),
      })
      .collect(),
  )
}
