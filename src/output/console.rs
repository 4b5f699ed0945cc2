// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/output/console.rs - 控制台文本报告
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

use std::{fmt, io::Write};

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  output::Render,
  result::{FactValue, ResolvedResult},
};

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(ConsoleOutput)
  }
}

/// 控制台文本报告：名称、置信度、描述，随后逐行列出营养数值
pub struct Report<'a>(pub &'a ResolvedResult);

impl fmt::Display for Report<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let result = self.0;
    writeln!(f, "{}", result.display_label)?;
    writeln!(f, "Confidence: {}", result.confidence_text)?;
    writeln!(f, "{}", result.description)?;
    for (name, value, unit) in result.nutrition_facts.entries() {
      match value {
        FactValue::Amount(_) => writeln!(f, "  {name:<8} {value} {unit}")?,
        FactValue::Unknown => writeln!(f, "  {name:<8} {value}")?,
      }
    }
    Ok(())
  }
}

impl ConsoleOutput {
  pub fn report(&self, result: &ResolvedResult) -> String {
    Report(result).to_string()
  }
}

impl Render<RgbFrame, ResolvedResult> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, _frame: &RgbFrame, result: &ResolvedResult) -> Result<(), Self::Error> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", Report(result))?;
    stdout.flush()?;
    Ok(())
  }
}
