// 该文件是 Gungeon Recognizer 项目的一部分。
// tests/recognition.rs - 端到端识别测试
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

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc, Mutex,
    atomic::AtomicBool,
  },
};

use image::{Rgb, RgbImage};
use url::Url;

use gungeon_recognizer::{
  FromUrl,
  frame::ClassifierInput,
  input::{CaptureOptions, InputWrapper, IntoRequests, Viewfinder},
  model::{Model, ScoreVector},
  output::Render,
  pipeline::{PipelineConfig, RecognitionPipeline, RecognitionRequest},
  select::RankedResult,
  task::{ContinuousTask, OneShotTask, Task},
  worker::RecognitionWorker,
};

/// 三个类别分别对应 RGB 通道均值；全黑输入返回空分数向量
struct ChannelScores;

impl Model for ChannelScores {
  type Input = ClassifierInput;
  type Output = ScoreVector;
  type Error = std::io::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let data = input.as_ref();
    if data.iter().all(|&v| v == 0.0) {
      return Ok(ScoreVector::from(Vec::new()));
    }
    let pixels = (data.len() / 3) as f32;
    let scores = (0..3)
      .map(|c| data.iter().skip(c).step_by(3).sum::<f32>() / pixels)
      .collect::<Vec<_>>();
    Ok(ScoreVector::from(scores))
  }
}

#[derive(Default)]
struct Collector {
  seen: Mutex<Vec<(Option<PathBuf>, Vec<u32>)>>,
}

impl Render<RecognitionRequest, RankedResult> for &Collector {
  type Error = std::io::Error;

  fn render_result(
    &self,
    frame: &RecognitionRequest,
    result: &RankedResult,
  ) -> Result<(), Self::Error> {
    self
      .seen
      .lock()
      .map_err(|_| std::io::Error::other("poisoned"))?
      .push((frame.source.clone(), result.class_ids().collect()));
    Ok(())
  }
}

fn pipeline() -> RecognitionPipeline<ChannelScores> {
  RecognitionPipeline::new(
    ChannelScores,
    PipelineConfig {
      num_classes: 3,
      ..Default::default()
    },
  )
}

fn options() -> CaptureOptions {
  CaptureOptions {
    viewfinder: Viewfinder::default(),
    crop: None,
    top_k: 2,
  }
}

/// a: 红色 40x30，b: 全黑，c: 绿色 10x10，d: 损坏文件
fn shots(dir: &Path) -> Url {
  RgbImage::from_pixel(40, 30, Rgb([255, 0, 0]))
    .save(dir.join("a.png"))
    .unwrap();
  RgbImage::new(20, 20).save(dir.join("b.png")).unwrap();
  RgbImage::from_pixel(10, 10, Rgb([0, 255, 0]))
    .save(dir.join("c.png"))
    .unwrap();
  std::fs::write(dir.join("d.png"), b"\x89PNG broken").unwrap();
  Url::parse(&format!("folder://{}", dir.display())).unwrap()
}

#[test]
fn continuous_task_renders_every_successful_request() {
  let dir = tempfile::tempdir().unwrap();
  let input = InputWrapper::from_url(&shots(dir.path())).unwrap();
  let worker = RecognitionWorker::spawn(pipeline()).unwrap();
  let collector = Collector::default();

  ContinuousTask::default()
    .with_stop_flag(Arc::new(AtomicBool::new(false)))
    .run_task(input.into_requests(options()), worker, &collector)
    .unwrap();

  let seen = collector.seen.into_inner().unwrap();
  assert_eq!(seen.len(), 2);
  assert_eq!(seen[0].0.as_deref(), Some(dir.path().join("a.png").as_path()));
  assert_eq!(seen[0].1, vec![0, 1]);
  assert_eq!(seen[1].0.as_deref(), Some(dir.path().join("c.png").as_path()));
  assert_eq!(seen[1].1, vec![1, 0]);
}

#[test]
fn continuous_task_honours_frame_limit_and_stop_flag() {
  let dir = tempfile::tempdir().unwrap();
  let url = shots(dir.path());

  let collector = Collector::default();
  ContinuousTask::default()
    .with_frame_number(Some(1))
    .with_stop_flag(Arc::new(AtomicBool::new(false)))
    .run_task(
      InputWrapper::from_url(&url).unwrap().into_requests(options()),
      RecognitionWorker::spawn(pipeline()).unwrap(),
      &collector,
    )
    .unwrap();
  assert_eq!(collector.seen.lock().unwrap().len(), 1);

  let collector = Collector::default();
  ContinuousTask::default()
    .with_stop_flag(Arc::new(AtomicBool::new(true)))
    .run_task(
      InputWrapper::from_url(&url).unwrap().into_requests(options()),
      RecognitionWorker::spawn(pipeline()).unwrap(),
      &collector,
    )
    .unwrap();
  assert!(collector.seen.lock().unwrap().is_empty());
}

#[test]
fn one_shot_reports_classification_failures() {
  let collector = Collector::default();
  let black = RecognitionRequest::new(RgbImage::new(16, 16), 2);
  assert!(
    OneShotTask
      .run_task([black].into_iter(), pipeline(), &collector)
      .is_err()
  );
  assert!(collector.seen.lock().unwrap().is_empty());
}

#[test]
fn uniform_gray_frame_yields_a_full_shortlist() {
  let request = RecognitionRequest::new(RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])), 5);
  let result = pipeline().recognize(&request).unwrap();
  assert_eq!(result.len(), 3);
  assert!(result.iter().all(|c| c.score.is_finite()));
  // 三个通道分数相同，编号小者在前
  assert_eq!(result.class_ids().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[cfg(feature = "directory_record")]
#[test]
fn directory_record_keeps_png_and_json_per_request() {
  use gungeon_recognizer::output::OutputWrapper;

  let shots_dir = tempfile::tempdir().unwrap();
  let records_dir = tempfile::tempdir().unwrap();
  let input = InputWrapper::from_url(&shots(shots_dir.path())).unwrap();
  let output = OutputWrapper::from_url(
    &Url::parse(&format!("folder://{}", records_dir.path().display())).unwrap(),
  )
  .unwrap();

  ContinuousTask::default()
    .with_stop_flag(Arc::new(AtomicBool::new(false)))
    .run_task(
      input.into_requests(options()),
      RecognitionWorker::spawn(pipeline()).unwrap(),
      output,
    )
    .unwrap();

  let mut count = 0;
  let mut stack = vec![records_dir.path().to_path_buf()];
  while let Some(dir) = stack.pop() {
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        stack.push(path);
      } else {
        count += 1;
      }
    }
  }
  assert_eq!(count, 4);
}
