// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/result.rs - 检测结果与营养数据的合成
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

use std::fmt;

use serde::{Serialize, Serializer};

use crate::{
  model::Detection,
  nutrition::{NutritionRecord, NutritionResolver},
};

pub const UNKNOWN_DISH_LABEL: &str = "Unknown Dish";
pub const NO_DETECTION_TEXT: &str = "—";
pub const NOT_IDENTIFIED_DESCRIPTION: &str = "Could not identify a dish in this image.";
pub const NO_DESCRIPTION: &str = "No description available.";
pub const UNKNOWN_MARKER: &str = "unknown";

/// 单项营养数值，缺失时为未知
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FactValue {
  Amount(f64),
  #[default]
  Unknown,
}

impl From<Option<f64>> for FactValue {
  fn from(value: Option<f64>) -> Self {
    value.map_or(FactValue::Unknown, FactValue::Amount)
  }
}

impl FactValue {
  pub fn is_unknown(self) -> bool {
    matches!(self, FactValue::Unknown)
  }
}

impl fmt::Display for FactValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FactValue::Amount(a) => write!(f, "{a}"),
      FactValue::Unknown => f.write_str(UNKNOWN_MARKER),
    }
  }
}

impl Serialize for FactValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      FactValue::Amount(a) if a.fract() == 0.0 && a.abs() < 1e15 => {
        serializer.serialize_i64(*a as i64)
      }
      FactValue::Amount(a) => serializer.serialize_f64(*a),
      FactValue::Unknown => serializer.serialize_str(UNKNOWN_MARKER),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NutritionFacts {
  pub calories: FactValue,
  pub fat: FactValue,
  pub sugar: FactValue,
  pub salt: FactValue,
}

impl NutritionFacts {
  pub const UNKNOWN: NutritionFacts = NutritionFacts {
    calories: FactValue::Unknown,
    fat: FactValue::Unknown,
    sugar: FactValue::Unknown,
    salt: FactValue::Unknown,
  };

  fn from_record(record: Option<&NutritionRecord>) -> Self {
    match record {
      Some(r) => Self {
        calories: r.calories.into(),
        fat: r.fat.into(),
        sugar: r.sugar.into(),
        salt: r.salt.into(),
      },
      None => Self::UNKNOWN,
    }
  }

  /// (名称, 数值, 单位)
  pub fn entries(&self) -> [(&'static str, FactValue, &'static str); 4] {
    [
      ("Calories", self.calories, "kcal"),
      ("Fat", self.fat, "g"),
      ("Sugar", self.sugar, "g"),
      ("Salt", self.salt, "g"),
    ]
  }
}

/// 交给展示层的最终结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedResult {
  pub display_label: String,
  pub confidence_text: String,
  pub description: String,
  pub nutrition_facts: NutritionFacts,
  pub class_id: Option<String>,
  pub confidence: Option<f32>,
}

impl ResolvedResult {
  /// 没有检测结果时的固定形态
  pub fn no_detection() -> Self {
    Self {
      display_label: UNKNOWN_DISH_LABEL.to_string(),
      confidence_text: NO_DETECTION_TEXT.to_string(),
      description: NOT_IDENTIFIED_DESCRIPTION.to_string(),
      nutrition_facts: NutritionFacts::UNKNOWN,
      class_id: None,
      confidence: None,
    }
  }

  pub fn is_detected(&self) -> bool {
    self.class_id.is_some()
  }
}

/// 取第一个检测结果（不按置信度重选），查表并合成展示结果
pub fn assemble<R: NutritionResolver + ?Sized>(detections: &[Detection], resolver: &R) -> ResolvedResult {
  let Some(top) = detections.first() else {
    return ResolvedResult::no_detection();
  };

  let record = resolver.resolve(&top.class_id);
  let label = record
    .and_then(|r| r.display_name.as_deref())
    .unwrap_or(top.class_id.as_str());
  let description = record
    .and_then(|r| r.description.as_deref())
    .unwrap_or(NO_DESCRIPTION);

  ResolvedResult {
    display_label: display_label(label),
    confidence_text: confidence_text(top.confidence),
    description: description.to_string(),
    nutrition_facts: NutritionFacts::from_record(record),
    class_id: Some(top.class_id.clone()),
    confidence: Some(top.confidence),
  }
}

/// 下划线转空格后按单词首字母大写，其余字母小写
pub fn display_label(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut in_word = false;
  for ch in raw.chars() {
    let ch = if ch == '_' { ' ' } else { ch };
    if ch.is_alphabetic() {
      if in_word {
        out.extend(ch.to_lowercase());
      } else {
        out.extend(ch.to_uppercase());
      }
      in_word = true;
    } else {
      out.push(ch);
      in_word = false;
    }
  }
  out
}

/// 百分比，保留一位小数：0.873 -> "87.3%"
pub fn confidence_text(confidence: f32) -> String {
  format!("{:.1}%", f64::from(confidence) * 100.0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;
  use std::collections::HashMap;

  fn detection(class_id: &str, confidence: f32) -> Detection {
    Detection {
      class_id: class_id.to_string(),
      class_index: 0,
      confidence,
      bbox: [0.0, 0.0, 1.0, 1.0],
    }
  }

  fn table() -> HashMap<String, NutritionRecord> {
    let mut table = HashMap::new();
    table.insert(
      "pho_bo".to_string(),
      NutritionRecord {
        display_name: Some("Pho Bo".to_string()),
        description: Some("Beef noodle soup".to_string()),
        calories: Some(450.0),
        fat: Some(12.5),
        sugar: None,
        salt: Some(2.1),
      },
    );
    table.insert(
      "com_tam".to_string(),
      NutritionRecord {
        display_name: Some("com tam SUON".to_string()),
        ..NutritionRecord::default()
      },
    );
    table
  }

  #[test]
  fn known_dish_resolves_record() {
    let result = assemble(&[detection("pho_bo", 0.87)], &table());
    assert_eq!(result.display_label, "Pho Bo");
    assert_eq!(result.confidence_text, "87.0%");
    assert_eq!(result.description, "Beef noodle soup");
    assert_eq!(result.nutrition_facts.calories, FactValue::Amount(450.0));
    assert_eq!(result.nutrition_facts.fat, FactValue::Amount(12.5));
    assert_eq!(result.nutrition_facts.sugar, FactValue::Unknown);
    assert_eq!(result.nutrition_facts.salt, FactValue::Amount(2.1));
    assert_eq!(result.class_id.as_deref(), Some("pho_bo"));
  }

  #[test]
  fn unknown_dish_uses_class_id() {
    let result = assemble(&[detection("unknown_dish_x", 0.31)], &table());
    assert_eq!(result.display_label, "Unknown Dish X");
    assert_eq!(result.confidence_text, "31.0%");
    assert_eq!(result.description, NO_DESCRIPTION);
    assert_eq!(result.nutrition_facts, NutritionFacts::UNKNOWN);
  }

  #[test]
  fn no_detections_gives_canonical_empty_result() {
    let result = assemble(&[], &table());
    assert_eq!(result, ResolvedResult::no_detection());
    assert_eq!(result.display_label, "Unknown Dish");
    assert_eq!(result.confidence_text, "—");
    assert!(!result.is_detected());

    let empty: HashMap<String, NutritionRecord> = HashMap::new();
    assert_eq!(assemble(&[], &empty), ResolvedResult::no_detection());
  }

  #[test]
  fn first_detection_wins_over_higher_confidence() {
    let detections = [detection("com_tam", 0.4), detection("pho_bo", 0.95)];
    let result = assemble(&detections, &table());
    assert_eq!(result.display_label, "Com Tam Suon");
    assert_eq!(result.confidence_text, "40.0%");
    assert_eq!(result.description, NO_DESCRIPTION);
    assert_eq!(result.nutrition_facts, NutritionFacts::UNKNOWN);
  }

  #[test]
  fn confidence_formatting() {
    assert_eq!(confidence_text(0.25), "25.0%");
    assert_eq!(confidence_text(0.999), "99.9%");
    assert_eq!(confidence_text(1.0), "100.0%");
    assert_eq!(confidence_text(0.873), "87.3%");
  }

  #[test]
  fn label_formatting() {
    assert_eq!(display_label("pho_bo"), "Pho Bo");
    assert_eq!(display_label("BANH_MI"), "Banh Mi");
    assert_eq!(display_label("bún chả"), "Bún Chả");
    assert_eq!(display_label("7up_float"), "7Up Float");
    assert_eq!(display_label(""), "");
  }

  #[test]
  fn facts_serialize_with_unknown_marker() {
    let result = assemble(&[detection("pho_bo", 0.87)], &table());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["nutrition_facts"]["calories"], 450);
    assert_eq!(json["nutrition_facts"]["fat"], 12.5);
    assert_eq!(json["nutrition_facts"]["sugar"], "unknown");
    assert_eq!(json["display_label"], "Pho Bo");
  }

  proptest! {
    #[test]
    fn label_transform_is_idempotent(raw in "[A-Za-z0-9_ ]{0,24}") {
      let once = display_label(&raw);
      prop_assert_eq!(display_label(&once), once.clone());
      prop_assert!(!once.contains('_'));
    }

    #[test]
    fn empty_detections_ignore_resolver(ids in proptest::collection::vec("[a-z_]{1,8}", 0..4)) {
      let resolver: HashMap<String, NutritionRecord> = ids
        .into_iter()
        .map(|id| (id, NutritionRecord { calories: Some(1.0), ..NutritionRecord::default() }))
        .collect();
      prop_assert_eq!(assemble(&[], &resolver), ResolvedResult::no_detection());
    }
  }
}
