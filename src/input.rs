// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

mod upload;
pub use self::upload::{UploadError, decode_upload};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() == ImageFileInput::SCHEME {
      let input = ImageFileInput::from_url(url)?;
      return Ok(InputWrapper::ReadImageFile(input));
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}
