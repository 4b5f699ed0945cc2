// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/model/labels.rs - 类别标签集
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

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件读取错误 {0}: {1}")]
  IoError(String, std::io::Error),
  #[error("标签文件为空: {0}")]
  Empty(String),
}

/// 模型类别标签，行号即类别索引
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
  labels: Box<[String]>,
}

impl LabelSet {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|e| LabelError::IoError(path.display().to_string(), e))?;
    let labels = Self::parse(&text);
    if labels.is_empty() {
      return Err(LabelError::Empty(path.display().to_string()));
    }
    debug!("加载 {} 个类别标签: {}", labels.len(), path.display());
    Ok(labels)
  }

  pub fn parse(text: &str) -> Self {
    text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect()
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, index: u32) -> Option<&str> {
    self.labels.get(index as usize).map(String::as_str)
  }

  /// 超出标签集的索引以十进制字符串作为类别标识
  pub fn class_id(&self, index: u32) -> String {
    match self.get(index) {
      Some(label) => label.to_string(),
      None => index.to_string(),
    }
  }
}

impl FromIterator<String> for LabelSet {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self {
      labels: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_skips_blank_lines() {
    let labels = LabelSet::parse("pho_bo\n\n  banh_mi  \r\ncom_tam\n");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(1), Some("banh_mi"));
    assert_eq!(labels.class_id(2), "com_tam");
  }

  #[test]
  fn unknown_index_falls_back_to_number() {
    let labels = LabelSet::parse("pho_bo");
    assert_eq!(labels.class_id(7), "7");
  }

  #[test]
  fn empty_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.txt");
    std::fs::write(&path, "\n\n").unwrap();
    assert!(matches!(LabelSet::load(&path), Err(LabelError::Empty(_))));
    assert!(matches!(
      LabelSet::load(dir.path().join("missing.txt")),
      Err(LabelError::IoError(..))
    ));
  }
}
