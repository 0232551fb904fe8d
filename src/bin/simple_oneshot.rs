// 该文件是 Gungeon Recognizer 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像识别
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use gungeon_recognizer::{
  FromUrl,
  input::{CaptureOptions, ImageFileInput, IntoRequests, Viewfinder},
  model::ModelWrapper,
  output::OutputWrapper,
  pipeline::{DEFAULT_TOP_K, PipelineConfig, RecognitionPipeline},
  task::{OneShotTask, Task},
};
use tracing::info;

/// 单张图像识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,
  /// 候选列表长度
  #[arg(long, default_value_t = DEFAULT_TOP_K)]
  pub top_k: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let model = ModelWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let config = PipelineConfig {
    num_classes: model.num_classes().unwrap_or(PipelineConfig::default().num_classes),
    ..Default::default()
  };
  let options = CaptureOptions {
    viewfinder: Viewfinder::default(),
    crop: None,
    top_k: args.top_k,
  };

  OneShotTask.run_task(
    input.into_requests(options),
    RecognitionPipeline::new(model, config),
    output,
  )?;

  Ok(())
}
