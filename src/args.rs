// 该文件是 FoodLens （食鉴） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use foodlens::ConfidenceThreshold;
use url::Url;

/// FoodLens 参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型地址
  /// 例如: yolo:///models/food.onnx?labels=/models/food.txt&size=640
  #[arg(long, env = "FOODLENS_MODEL", value_name = "MODEL")]
  pub model: Url,

  /// 营养数据文件地址，例如: json:///data/nutrition.json
  #[arg(long, env = "FOODLENS_NUTRITION", value_name = "TABLE")]
  pub nutrition: Url,

  /// 输入图像（JPEG/PNG），例如: image:///photos/dish.jpg
  #[arg(long, env = "FOODLENS_INPUT", value_name = "SOURCE")]
  pub input: Url,

  /// 输出方式
  /// 支持:
  /// - console://
  /// - json:///path/result.json
  #[arg(long, env = "FOODLENS_OUTPUT", default_value = "console://", value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0, 1.0]
  #[arg(
    long,
    env = "FOODLENS_CONFIDENCE",
    default_value_t = ConfidenceThreshold::DEFAULT,
    value_name = "THRESHOLD"
  )]
  pub confidence: ConfidenceThreshold,
}
