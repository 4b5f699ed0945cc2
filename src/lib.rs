// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod frame;
pub mod input;
pub mod model;
pub mod nutrition;
pub mod output;
pub mod pipeline;
pub mod result;
pub mod task;

pub use self::model::{ConfidenceThreshold, Detection, Detector};
pub use self::nutrition::{NutritionRecord, NutritionResolver, NutritionTable};
pub use self::pipeline::FoodPipeline;
pub use self::result::{FactValue, NutritionFacts, ResolvedResult, assemble};

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 从 URL 中取出经过百分号解码的文件路径
pub fn url_file_path(url: &url::Url) -> String {
  let path = url.path();
  match urlencoding::decode(path) {
    Ok(decoded) => decoded.into_owned(),
    Err(_) => path.to_string(),
  }
}

/// 读取 URL 查询参数中的单个值
pub fn url_query(url: &url::Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_percent_encoded_paths() {
    let url = url::Url::parse("image:///tmp/my%20dish.jpg").unwrap();
    assert_eq!(url_file_path(&url), "/tmp/my dish.jpg");
  }

  #[test]
  fn reads_query_values() {
    let url = url::Url::parse("yolo:///m.onnx?size=320&iou=0.5").unwrap();
    assert_eq!(url_query(&url, "size").as_deref(), Some("320"));
    assert_eq!(url_query(&url, "iou").as_deref(), Some("0.5"));
    assert_eq!(url_query(&url, "labels"), None);
  }
}
