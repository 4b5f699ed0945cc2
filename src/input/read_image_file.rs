// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use super::upload::{UploadError, ensure_supported};
use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, url_file_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法读取图像文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码失败: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("{0}")]
  Upload(#[from] UploadError),
}

/// 单张图像输入，迭代一次后耗尽
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!("输入方案应为 '{}', 实际为 '{}'", Self::SCHEME, url.scheme());
      return Err(ImageFileInputError::SchemeMismatch(url.scheme().to_string()));
    }

    Self::open(url_file_path(url))
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = ensure_supported(reader.format())?;
    let image = reader.decode()?.to_rgb8();
    info!(
      "读取图像 {}: {:?} {}x{}",
      path.display(),
      format,
      image.width(),
      image.height()
    );

    Ok(ImageFileInput { image: Some(image) })
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(RgbFrame::from)
  }
}
