// 该文件是 Gungeon Recognizer 项目的一部分。
// src/worker.rs - 后台识别工作线程
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

//! 单工作线程执行上下文。
//!
//! 同一时刻最多一个未完成请求：前一个请求的结果送达之前再次提交会被拒绝。
//! 每个请求恰好送达一个 [`Completion`]，请求一旦开始便执行到结束，不支持取消。

use std::{
  panic::{self, AssertUnwindSafe},
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError},
  },
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  model::Classifier,
  pipeline::{RecognitionError, RecognitionPipeline, RecognitionRequest},
  select::RankedResult,
};

const WORKER_THREAD_NAME: &str = "recognizer";

#[derive(Error, Debug)]
pub enum WorkerError {
  #[error("已有识别请求正在执行")]
  Busy,
  #[error("识别线程已停止")]
  Stopped,
  #[error("无法创建识别线程: {0}")]
  Spawn(#[from] std::io::Error),
}

/// 一次请求的完成通知，请求本身随结果一并交还
#[derive(Debug)]
pub struct Completion {
  pub id: u64,
  pub request: RecognitionRequest,
  pub result: Result<RankedResult, RecognitionError>,
  pub elapsed: Duration,
}

/// 分类器在推理中途 panic
#[derive(Error, Debug)]
#[error("分类器异常终止: {0}")]
pub struct ClassifierPanic(String);

impl ClassifierPanic {
  fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
    let message = payload
      .downcast_ref::<&str>()
      .map(|s| s.to_string())
      .or_else(|| payload.downcast_ref::<String>().cloned())
      .unwrap_or_else(|| "未知原因".to_string());
    Self(message)
  }
}

/// 线程退出（包括展开）时释放占用标记
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

struct Job {
  id: u64,
  request: RecognitionRequest,
  reply: SyncSender<Completion>,
}

/// 已提交、尚未取回结果的请求
pub struct PendingRecognition {
  id: u64,
  rx: Receiver<Completion>,
}

impl PendingRecognition {
  pub fn id(&self) -> u64 {
    self.id
  }

  /// 阻塞直到结果送达
  pub fn wait(self) -> Result<Completion, WorkerError> {
    self.rx.recv().map_err(|_| WorkerError::Stopped)
  }

  /// 非阻塞查询
  pub fn try_wait(&self) -> Result<Option<Completion>, WorkerError> {
    match self.rx.try_recv() {
      Ok(completion) => Ok(Some(completion)),
      Err(TryRecvError::Empty) => Ok(None),
      Err(TryRecvError::Disconnected) => Err(WorkerError::Stopped),
    }
  }

  pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<Completion>, WorkerError> {
    match self.rx.recv_timeout(timeout) {
      Ok(completion) => Ok(Some(completion)),
      Err(RecvTimeoutError::Timeout) => Ok(None),
      Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Stopped),
    }
  }
}

pub struct RecognitionWorker {
  jobs: Option<SyncSender<Job>>,
  busy: Arc<AtomicBool>,
  next_id: AtomicU64,
  handle: Option<JoinHandle<()>>,
}

impl RecognitionWorker {
  /// 创建工作线程，流水线的所有权移入该线程
  pub fn spawn<M>(pipeline: RecognitionPipeline<M>) -> Result<Self, WorkerError>
  where
    M: Classifier + Send + 'static,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let (jobs, rx) = mpsc::sync_channel::<Job>(1);
    let busy = Arc::new(AtomicBool::new(false));

    let worker_busy = busy.clone();
    let handle = thread::Builder::new()
      .name(WORKER_THREAD_NAME.to_string())
      .spawn(move || {
        info!("识别线程启动");
        let _guard = BusyGuard(worker_busy.clone());
        for job in rx {
          debug!("开始处理请求 #{}", job.id);
          let now = Instant::now();
          let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.recognize(&job.request)))
            .unwrap_or_else(|payload| {
              let cause = ClassifierPanic::from_payload(payload);
              error!("请求 #{} 识别时发生 panic: {}", job.id, cause);
              Err(RecognitionError::ClassificationUnavailable(Box::new(cause)))
            });
          let elapsed = now.elapsed();

          // 先释放占用标记再通知，收到结果的调用方可以立即提交下一个请求
          worker_busy.store(false, Ordering::Release);
          let completion = Completion {
            id: job.id,
            request: job.request,
            result,
            elapsed,
          };
          if job.reply.send(completion).is_err() {
            warn!("请求 #{} 的调用方已放弃结果", job.id);
          }
        }
        info!("识别线程退出");
      })?;

    Ok(Self {
      jobs: Some(jobs),
      busy,
      next_id: AtomicU64::new(0),
      handle: Some(handle),
    })
  }

  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::Acquire)
  }

  /// 提交请求；已有未完成请求时返回 [`WorkerError::Busy`]
  pub fn submit(&self, request: RecognitionRequest) -> Result<PendingRecognition, WorkerError> {
    let jobs = self.jobs.as_ref().ok_or(WorkerError::Stopped)?;
    if self.handle.as_ref().is_none_or(|h| h.is_finished()) {
      return Err(WorkerError::Stopped);
    }

    if self
      .busy
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return Err(WorkerError::Busy);
    }

    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let (reply, rx) = mpsc::sync_channel(1);
    if jobs.send(Job { id, request, reply }).is_err() {
      self.busy.store(false, Ordering::Release);
      return Err(WorkerError::Stopped);
    }

    debug!("已提交请求 #{}", id);
    Ok(PendingRecognition { id, rx })
  }
}

impl Drop for RecognitionWorker {
  fn drop(&mut self) {
    // 关闭任务通道，线程处理完手上的请求后退出
    self.jobs.take();
    if let Some(handle) = self.handle.take()
      && handle.join().is_err()
    {
      warn!("识别线程异常退出");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::ClassifierInput,
    model::{Model, ScoreVector},
    pipeline::PipelineConfig,
  };
  use image::{Rgb, RgbImage};
  use std::sync::Mutex;

  struct Brightness;

  impl Model for Brightness {
    type Input = ClassifierInput;
    type Output = ScoreVector;
    type Error = std::io::Error;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      let mean = input.as_ref().iter().sum::<f32>() / input.len() as f32;
      Ok(ScoreVector::from(vec![mean, 1.0 - mean, 0.5]))
    }
  }

  /// 收到放行信号之前一直阻塞
  struct Gate {
    release: Mutex<Receiver<()>>,
  }

  impl Model for Gate {
    type Input = ClassifierInput;
    type Output = ScoreVector;
    type Error = std::io::Error;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      let release = self.release.lock().unwrap();
      release
        .recv()
        .map_err(|_| std::io::Error::other("放行通道已关闭"))?;
      Ok(ScoreVector::from(vec![0.0, 1.0, 2.0]))
    }
  }

  fn config() -> PipelineConfig {
    PipelineConfig {
      num_classes: 3,
      ..Default::default()
    }
  }

  fn request(level: u8) -> RecognitionRequest {
    RecognitionRequest::new(RgbImage::from_pixel(16, 16, Rgb([level, level, level])), 2)
  }

  #[test]
  fn each_request_gets_exactly_one_completion() {
    let worker = RecognitionWorker::spawn(RecognitionPipeline::new(Brightness, config())).unwrap();

    for (expected_id, level) in [255u8, 0].into_iter().enumerate() {
      let pending = worker.submit(request(level)).unwrap();
      assert_eq!(pending.id(), expected_id as u64);

      let completion = pending.wait().unwrap();
      assert_eq!(completion.id, expected_id as u64);
      assert_eq!(completion.request.image.get_pixel(0, 0), &Rgb([level, level, level]));

      let best = completion.result.unwrap().best().copied().unwrap();
      assert_eq!(best.class_id, if level == 255 { 0 } else { 1 });
      assert!(!worker.is_busy());
    }
  }

  #[test]
  fn second_request_is_rejected_while_busy() {
    let (release, gate) = mpsc::channel();
    let model = Gate {
      release: Mutex::new(gate),
    };
    let worker = RecognitionWorker::spawn(RecognitionPipeline::new(model, config())).unwrap();

    let pending = worker.submit(request(10)).unwrap();
    assert!(worker.is_busy());
    assert!(matches!(worker.submit(request(20)), Err(WorkerError::Busy)));
    assert!(pending.try_wait().unwrap().is_none());

    release.send(()).unwrap();
    let completion = pending.wait().unwrap();
    let ids: Vec<u32> = completion.result.unwrap().class_ids().collect();
    assert_eq!(ids, vec![2, 1]);

    let pending = worker.submit(request(30)).unwrap();
    release.send(()).unwrap();
    assert!(pending.wait_timeout(Duration::from_secs(10)).unwrap().is_some());
  }

  #[test]
  fn failures_are_delivered_as_completions() {
    let worker = RecognitionWorker::spawn(RecognitionPipeline::new(Brightness, config())).unwrap();
    let bad = RecognitionRequest::new(RgbImage::new(8, 4), 1);

    let completion = worker.submit(bad).unwrap().wait().unwrap();
    assert!(matches!(completion.result, Err(RecognitionError::Preprocess(_))));
    assert!(worker.submit(request(1)).is_ok());
  }

  struct Boom;

  impl Model for Boom {
    type Input = ClassifierInput;
    type Output = ScoreVector;
    type Error = std::io::Error;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      panic!("分类器内部错误");
    }
  }

  #[test]
  fn classifier_panic_is_delivered_and_worker_stays_usable() {
    let worker = RecognitionWorker::spawn(RecognitionPipeline::new(Boom, config())).unwrap();

    let completion = worker.submit(request(10)).unwrap().wait().unwrap();
    let err = completion.result.unwrap_err();
    assert!(err.is_classification_unavailable());
    assert!(err.to_string().contains("分类器内部错误"));
    assert!(!worker.is_busy());

    let completion = worker.submit(request(20)).unwrap().wait().unwrap();
    assert_eq!(completion.id, 1);
    assert!(completion.result.is_err());
  }

  #[test]
  fn busy_flag_is_released_when_the_thread_exits() {
    let busy = Arc::new(AtomicBool::new(true));
    let flag = busy.clone();
    let handle = thread::spawn(move || {
      let _guard = BusyGuard(flag);
      panic!("线程展开");
    });
    assert!(handle.join().is_err());
    assert!(!busy.load(Ordering::Acquire));
  }
}
