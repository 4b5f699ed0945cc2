// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/nutrition.rs - 营养成分参考表
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

use std::{collections::HashMap, io::Read, path::Path};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_file_path};

#[derive(Error, Debug)]
pub enum NutritionError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("营养数据文件读取错误 {0}: {1}")]
  IoError(String, std::io::Error),
  #[error("营养数据格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 单个类别的营养参考数据，各字段独立可缺省
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NutritionRecord {
  #[serde(default, deserialize_with = "non_empty_text")]
  pub display_name: Option<String>,
  #[serde(default, deserialize_with = "non_empty_text")]
  pub description: Option<String>,
  #[serde(default, deserialize_with = "amount_or_unknown")]
  pub calories: Option<f64>,
  #[serde(default, deserialize_with = "amount_or_unknown")]
  pub fat: Option<f64>,
  #[serde(default, deserialize_with = "amount_or_unknown")]
  pub sugar: Option<f64>,
  #[serde(default, deserialize_with = "amount_or_unknown")]
  pub salt: Option<f64>,
}

// 数字或可解析为数字的字符串有效，其余（null、"unknown" 等）视为未知
fn amount_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
  let value = Value::deserialize(deserializer)?;
  let amount = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  Ok(amount.filter(|a| a.is_finite()))
}

fn non_empty_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  let text = Option::<String>::deserialize(deserializer)?;
  Ok(text.filter(|t| !t.trim().is_empty()))
}

/// 按类别标识精确查找营养数据
pub trait NutritionResolver {
  fn resolve(&self, class_id: &str) -> Option<&NutritionRecord>;
}

impl NutritionResolver for HashMap<String, NutritionRecord> {
  fn resolve(&self, class_id: &str) -> Option<&NutritionRecord> {
    self.get(class_id)
  }
}

impl<R: NutritionResolver + ?Sized> NutritionResolver for &R {
  fn resolve(&self, class_id: &str) -> Option<&NutritionRecord> {
    (**self).resolve(class_id)
  }
}

impl<R: NutritionResolver + ?Sized> NutritionResolver for std::sync::Arc<R> {
  fn resolve(&self, class_id: &str) -> Option<&NutritionRecord> {
    (**self).resolve(class_id)
  }
}

/// 启动时加载一次、此后只读的营养参考表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionTable {
  records: HashMap<String, NutritionRecord>,
}

impl FromUrlWithScheme for NutritionTable {
  const SCHEME: &'static str = "json";
}

impl FromUrl for NutritionTable {
  type Error = NutritionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(NutritionError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::load(url_file_path(url))
  }
}

impl NutritionTable {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, NutritionError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
      .map_err(|e| NutritionError::IoError(path.display().to_string(), e))?;
    let table = Self::from_reader(file)?;
    info!(
      "加载营养数据 {}: {} 条记录",
      path.display(),
      table.len()
    );
    Ok(table)
  }

  pub fn from_reader(reader: impl Read) -> Result<Self, NutritionError> {
    let records: HashMap<String, NutritionRecord> = serde_json::from_reader(reader)?;
    let table = Self { records };
    table.warn_incomplete();
    Ok(table)
  }

  pub fn from_json_str(text: &str) -> Result<Self, NutritionError> {
    Self::from_reader(text.as_bytes())
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  fn warn_incomplete(&self) {
    for (class_id, record) in &self.records {
      if record.display_name.is_none() {
        warn!("营养记录缺少 display_name: {}", class_id);
      }
    }
  }
}

impl FromIterator<(String, NutritionRecord)> for NutritionTable {
  fn from_iter<I: IntoIterator<Item = (String, NutritionRecord)>>(iter: I) -> Self {
    Self {
      records: iter.into_iter().collect(),
    }
  }
}

impl NutritionResolver for NutritionTable {
  fn resolve(&self, class_id: &str) -> Option<&NutritionRecord> {
    self.records.get(class_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"{
    "pho_bo": {
      "display_name": "Pho Bo",
      "description": "Beef noodle soup",
      "calories": 450,
      "fat": "12.5",
      "sugar": "unknown",
      "salt": null
    },
    "banh_mi": { "display_name": "  ", "calories": 380.5 }
  }"#;

  #[test]
  fn fields_parse_independently() {
    let table = NutritionTable::from_json_str(SAMPLE).unwrap();
    assert_eq!(table.len(), 2);

    let pho = table.resolve("pho_bo").unwrap();
    assert_eq!(pho.display_name.as_deref(), Some("Pho Bo"));
    assert_eq!(pho.calories, Some(450.0));
    assert_eq!(pho.fat, Some(12.5));
    assert_eq!(pho.sugar, None);
    assert_eq!(pho.salt, None);

    let banh_mi = table.resolve("banh_mi").unwrap();
    assert_eq!(banh_mi.display_name, None);
    assert_eq!(banh_mi.description, None);
    assert_eq!(banh_mi.calories, Some(380.5));
    assert_eq!(banh_mi.fat, None);
  }

  #[test]
  fn lookup_is_exact() {
    let table = NutritionTable::from_json_str(SAMPLE).unwrap();
    assert!(table.resolve("Pho_Bo").is_none());
    assert!(table.resolve("pho bo").is_none());
    assert!(table.resolve("").is_none());
  }

  #[test]
  fn malformed_json_is_fatal() {
    assert!(matches!(
      NutritionTable::from_json_str("[1, 2, 3]"),
      Err(NutritionError::JsonError(_))
    ));
    assert!(matches!(
      NutritionTable::from_json_str("{ \"pho_bo\": "),
      Err(NutritionError::JsonError(_))
    ));
  }

  #[test]
  fn missing_file_is_fatal() {
    let url = Url::parse("json:///nonexistent/foodlens/nutrition.json").unwrap();
    assert!(matches!(
      NutritionTable::from_url(&url),
      Err(NutritionError::IoError(..))
    ));
    let url = Url::parse("yaml:///nutrition.yaml").unwrap();
    assert!(matches!(
      NutritionTable::from_url(&url),
      Err(NutritionError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nutrition.json");
    std::fs::write(&path, SAMPLE).unwrap();
    let table = NutritionTable::load(&path).unwrap();
    assert!(table.resolve("pho_bo").is_some());
  }

  #[test]
  fn collects_from_records() {
    let table: NutritionTable = [(
      "com_tam".to_string(),
      NutritionRecord {
        display_name: Some("Com Tam".to_string()),
        calories: Some(600.0),
        ..NutritionRecord::default()
      },
    )]
    .into_iter()
    .collect();

    assert_eq!(table.len(), 1);
    let record = table.resolve("com_tam").unwrap();
    assert_eq!(record.calories, Some(600.0));
    assert_eq!(record.fat, None);
  }
}
