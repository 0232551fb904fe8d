// 该文件是 Gungeon Recognizer 项目的一部分。
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
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use clap::Parser;
use url::Url;

use gungeon_recognizer::{
  input::{CaptureOptions, Viewfinder, ViewfinderError},
  pipeline::{DEFAULT_NUM_CLASSES, DEFAULT_TOP_K, PipelineConfig},
  preprocess::{CropRegion, ResizeFilter},
};

/// Gungeon Recognizer 参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型，`dense://<file>.safetensors` 或 `onnx://<file>.onnx`
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源，`image://<file>` 或 `folder://<dir>`
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出，`log:`、`image://<file>.png` 或 `folder://<dir>`，
  /// 可附加 `?catalog=<file>.json` 显示物品名称
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  /// 候选列表长度
  #[arg(long, default_value_t = DEFAULT_TOP_K, value_name = "K")]
  pub top_k: usize,

  /// 目录条目数，必须与模型输出长度一致
  #[arg(long, default_value_t = DEFAULT_NUM_CLASSES, value_name = "N")]
  pub num_classes: usize,

  /// 取景框比例 (0.2 - 0.95)，缺省时取最大的居中正方形
  #[arg(long, value_name = "RATIO")]
  pub ratio: Option<f64>,

  /// 取景图像内裁剪区域的起点
  #[arg(long, default_value_t = 0, value_name = "PIXELS")]
  pub crop_start: u32,

  /// 取景图像内裁剪区域的边长，缺省时裁剪整幅取景图像
  #[arg(long, value_name = "PIXELS")]
  pub crop_edge: Option<u32>,

  /// 缩放到分类器输入尺寸时使用的插值方式
  #[arg(long, value_enum, default_value_t = ResizeFilter::Nearest)]
  pub filter: ResizeFilter,

  /// 最多处理的帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

impl Args {
  pub fn pipeline_config(&self) -> PipelineConfig {
    PipelineConfig {
      num_classes: self.num_classes,
      filter: self.filter,
    }
  }

  pub fn capture_options(&self) -> Result<CaptureOptions, ViewfinderError> {
    Ok(CaptureOptions {
      viewfinder: Viewfinder::new(self.ratio)?,
      crop: self
        .crop_edge
        .map(|edge| CropRegion::new(self.crop_start, edge)),
      top_k: self.top_k,
    })
  }
}
