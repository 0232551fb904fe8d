// 该文件是 Gungeon Recognizer 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;

use gungeon_recognizer::{
  FromUrl,
  input::{InputWrapper, IntoRequests},
  model::ModelWrapper,
  output::OutputWrapper,
  pipeline::RecognitionPipeline,
  task::{ContinuousTask, Task},
  worker::RecognitionWorker,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出: {}", args.output);
  info!("候选数: {}, 类别数: {}", args.top_k, args.num_classes);

  let options = args.capture_options()?;
  let config = args.pipeline_config();

  let model = ModelWrapper::from_url(&args.model)?;
  if let Some(n) = model.num_classes()
    && n != config.num_classes
  {
    bail!("模型输出 {} 个类别，与 --num-classes {} 不一致", n, config.num_classes);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let worker = RecognitionWorker::spawn(RecognitionPipeline::new(model, config))?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .run_task(input.into_requests(options), worker, output)?;

  Ok(())
}
