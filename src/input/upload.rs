// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/input/upload.rs - 内存中上传图像的解码
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

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use thiserror::Error;
use tracing::debug;

use crate::frame::RgbFrame;

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("Unsupported image format: {0}")]
  UnsupportedFormat(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image decoding error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 只接受 JPEG 与 PNG
pub(crate) fn ensure_supported(format: Option<ImageFormat>) -> Result<ImageFormat, UploadError> {
  match format {
    Some(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
    Some(other) => Err(UploadError::UnsupportedFormat(format!("{other:?}"))),
    None => Err(UploadError::UnsupportedFormat("unknown".to_string())),
  }
}

/// 按内容嗅探格式并解码上传的图像字节
pub fn decode_upload(bytes: &[u8]) -> Result<RgbFrame, UploadError> {
  let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
  let format = ensure_supported(reader.format())?;
  let image = reader.decode()?.to_rgb8();
  debug!(
    "上传图像解码完成: {:?} {}x{}",
    format,
    image.width(),
    image.height()
  );
  Ok(RgbFrame::from(image))
}
