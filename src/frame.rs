// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/frame.rs - RGB 帧与 letterbox 预处理
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

use image::{Rgb, RgbImage, imageops::FilterType};

const RGB_CHANNELS: usize = 3;
const LETTERBOX_FILL: u8 = 114;

/// 已解码的 RGB8 光栅图像，行优先、HWC 排布
#[derive(Debug, Clone)]
pub struct RgbFrame {
  image: RgbImage,
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    Self { image }
  }
}

impl RgbFrame {
  pub fn height(&self) -> usize {
    self.image.height() as usize
  }

  pub fn width(&self) -> usize {
    self.image.width() as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 等比缩放到 `size x size` 并居中填充，输出 [0, 1] 区间的 NCHW 浮点张量数据
  ///
  /// `size` 为 0 时按 1 处理。
  pub fn letterbox_nchw(&self, size: u32) -> (Vec<f32>, Letterbox) {
    let size = size.max(1);
    let letterbox = Letterbox::new(self.image.width(), self.image.height(), size);
    let resized = image::imageops::resize(
      &self.image,
      letterbox.resized_w,
      letterbox.resized_h,
      FilterType::Triangle,
    );

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    image::imageops::replace(
      &mut canvas,
      &resized,
      letterbox.pad_x as i64,
      letterbox.pad_y as i64,
    );

    let plane = (size as usize) * (size as usize);
    let mut data = vec![0f32; RGB_CHANNELS * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
      let idx = (y as usize) * (size as usize) + (x as usize);
      for c in 0..RGB_CHANNELS {
        data[c * plane + idx] = pixel[c] as f32 / 255.0;
      }
    }

    (data, letterbox)
  }
}

/// letterbox 变换参数，用于把模型坐标映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: u32,
  pub pad_y: u32,
  pub resized_w: u32,
  pub resized_h: u32,
  pub orig_w: u32,
  pub orig_h: u32,
}

impl Letterbox {
  pub fn new(orig_w: u32, orig_h: u32, size: u32) -> Self {
    let size = size.max(1);
    let orig_w = orig_w.max(1);
    let orig_h = orig_h.max(1);
    let scale = (size as f32 / orig_w as f32).min(size as f32 / orig_h as f32);
    let resized_w = ((orig_w as f32 * scale).round() as u32).clamp(1, size);
    let resized_h = ((orig_h as f32 * scale).round() as u32).clamp(1, size);

    Self {
      scale,
      pad_x: (size - resized_w) / 2,
      pad_y: (size - resized_h) / 2,
      resized_w,
      resized_h,
      orig_w,
      orig_h,
    }
  }

  /// 模型输入空间的 [x_min, y_min, x_max, y_max] 转为原图归一化坐标
  pub fn unmap(&self, bbox: [f32; 4]) -> [f32; 4] {
    let (w, h) = (self.orig_w as f32, self.orig_h as f32);
    let x = |v: f32| ((v - self.pad_x as f32) / self.scale / w).clamp(0.0, 1.0);
    let y = |v: f32| ((v - self.pad_y as f32) / self.scale / h).clamp(0.0, 1.0);
    [x(bbox[0]), y(bbox[1]), x(bbox[2]), y(bbox[3])]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn letterbox_pads_the_short_side() {
    let lb = Letterbox::new(1280, 640, 640);
    assert_eq!(lb.resized_w, 640);
    assert_eq!(lb.resized_h, 320);
    assert_eq!(lb.pad_x, 0);
    assert_eq!(lb.pad_y, 160);
  }

  #[test]
  fn unmap_returns_original_coordinates() {
    let lb = Letterbox::new(1280, 640, 640);
    // 原图中心一半大小的框：(320,160)-(960,480) -> 模型空间 (160,240)-(480,400)
    let bbox = lb.unmap([160.0, 240.0, 480.0, 400.0]);
    let expected = [0.25, 0.25, 0.75, 0.75];
    for (got, want) in bbox.iter().zip(expected) {
      assert!((got - want).abs() < 1e-4, "{bbox:?}");
    }
  }

  #[test]
  fn nchw_tensor_has_padding_and_pixels() {
    let image = RgbImage::from_pixel(4, 2, Rgb([255, 0, 0]));
    let frame = RgbFrame::from(image);
    let (data, lb) = frame.letterbox_nchw(4);
    assert_eq!(data.len(), 3 * 16);
    assert_eq!(lb.pad_y, 1);

    // 第 0 行为填充色
    assert!((data[0] - 114.0 / 255.0).abs() < 1e-6);
    // 第 1 行红色通道为 1，绿色通道为 0
    assert!((data[4] - 1.0).abs() < 1e-6);
    assert!(data[16 + 4].abs() < 1e-6);
  }

  #[test]
  fn zero_size_letterbox_does_not_panic() {
    let frame = RgbFrame::from(RgbImage::new(8, 8));
    let (data, lb) = frame.letterbox_nchw(0);
    assert_eq!(data.len(), 3);
    assert_eq!((lb.resized_w, lb.resized_h), (1, 1));
    assert_eq!((lb.pad_x, lb.pad_y), (0, 0));
  }
}
