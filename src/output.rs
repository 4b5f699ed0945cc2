// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, result::ResolvedResult};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod console;
pub use self::console::{ConsoleOutput, ConsoleOutputError};

#[cfg(feature = "json_output")]
mod json_file;
#[cfg(feature = "json_output")]
pub use self::json_file::{JsonFileOutput, JsonFileOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("控制台输出错误: {0}")]
  ConsoleOutputError(#[from] ConsoleOutputError),
  #[cfg(feature = "json_output")]
  #[error("JSON 文件输出错误: {0}")]
  JsonFileOutputError(#[from] JsonFileOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  ConsoleOutput(ConsoleOutput),
  #[cfg(feature = "json_output")]
  JsonFileOutput(JsonFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ConsoleOutput::SCHEME => {
        let output = ConsoleOutput::from_url(url)?;
        Ok(OutputWrapper::ConsoleOutput(output))
      }
      #[cfg(feature = "json_output")]
      JsonFileOutput::SCHEME => {
        let output = JsonFileOutput::from_url(url)?;
        Ok(OutputWrapper::JsonFileOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<RgbFrame, ResolvedResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbFrame, result: &ResolvedResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::ConsoleOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "json_output")]
      OutputWrapper::JsonFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
