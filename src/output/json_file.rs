// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/output/json_file.rs - 以 JSON 文件保存结果
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

use std::{
  io::{BufWriter, Write},
  path::PathBuf,
};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::RgbFrame, output::Render, result::ResolvedResult,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum JsonFileOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub struct JsonFileOutput {
  path: PathBuf,
}

#[derive(Serialize)]
struct ImageInfo {
  width: usize,
  height: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
  image: ImageInfo,
  result: &'a ResolvedResult,
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonFileOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonFileOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(JsonFileOutput {
      path: PathBuf::from(url_file_path(url)),
    })
  }
}

impl Render<RgbFrame, ResolvedResult> for JsonFileOutput {
  type Error = JsonFileOutputError;

  fn render_result(&self, frame: &RgbFrame, result: &ResolvedResult) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let report = JsonReport {
      image: ImageInfo {
        width: frame.width(),
        height: frame.height(),
      },
      result,
    };
    let file = std::fs::File::create(&self.path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;

    info!("保存结果到文件: {}", self.path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  #[test]
  fn writes_report_and_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out/result.json");
    let output = JsonFileOutput { path: path.clone() };

    let frame = RgbFrame::from(RgbImage::new(12, 8));
    output
      .render_result(&frame, &ResolvedResult::no_detection())
      .unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["image"]["width"], 12);
    assert_eq!(value["result"]["display_label"], "Unknown Dish");
    assert_eq!(value["result"]["nutrition_facts"]["salt"], "unknown");
    assert!(value["result"]["class_id"].is_null());
  }
}
