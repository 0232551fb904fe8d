// 该文件是 Gungeon Recognizer 项目的一部分。
// src/pipeline.rs - 单次识别流程
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

use std::{path::PathBuf, time::Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::{CLASSIFIER_INPUT_EDGE, ClassifierInput},
  model::{Classifier, Model},
  preprocess::{CropRegion, PreprocessError, Preprocessor, ResizeFilter},
  select::{RankedResult, select_top_k},
};

/// 出厂物品目录的条目数
pub const DEFAULT_NUM_CLASSES: usize = 509;

/// 结果网格 5 列 × 2 行
pub const DEFAULT_TOP_K: usize = 10;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum RecognitionError {
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("分类器不可用: {0}")]
  ClassificationUnavailable(#[source] BoxedError),
  #[error("分类器输出长度不匹配: 期望 {expected}, 实际 {actual}")]
  ScoreLengthMismatch { expected: usize, actual: usize },
}

impl RecognitionError {
  /// 本次请求没有产生任何结果是因为分类器，而不是输入
  pub fn is_classification_unavailable(&self) -> bool {
    matches!(
      self,
      RecognitionError::ClassificationUnavailable(_) | RecognitionError::ScoreLengthMismatch { .. }
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
  /// 目录条目数，分类器输出长度必须与之相等
  pub num_classes: usize,
  pub filter: ResizeFilter,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      num_classes: DEFAULT_NUM_CLASSES,
      filter: ResizeFilter::default(),
    }
  }
}

/// 一次识别请求，图像必须为正方形
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
  pub image: RgbImage,
  pub crop: CropRegion,
  pub top_k: usize,
  /// 请求来源，仅用于输出命名
  pub source: Option<PathBuf>,
}

impl RecognitionRequest {
  /// 裁剪区域覆盖整幅图像
  pub fn new(image: RgbImage, top_k: usize) -> Self {
    let crop = CropRegion::full(&image);
    Self {
      image,
      crop,
      top_k,
      source: None,
    }
  }

  pub fn with_crop(mut self, crop: CropRegion) -> Self {
    self.crop = crop;
    self
  }

  pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
    self.source = Some(source.into());
    self
  }
}

/// 预处理 → 分类 → 取前 K，请求之间不保留任何状态
pub struct RecognitionPipeline<M> {
  model: M,
  preprocessor: Preprocessor,
  config: PipelineConfig,
}

impl<M> RecognitionPipeline<M>
where
  M: Classifier,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M, config: PipelineConfig) -> Self {
    Self {
      model,
      preprocessor: Preprocessor::new(config.filter),
      config,
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn recognize(&self, request: &RecognitionRequest) -> Result<RankedResult, RecognitionError> {
    let now = Instant::now();

    let tensor: ClassifierInput = self
      .preprocessor
      .preprocess::<CLASSIFIER_INPUT_EDGE, CLASSIFIER_INPUT_EDGE>(&request.image, request.crop)?;
    let preprocess_elapsed = now.elapsed();
    debug!("预处理完成，耗时: {:.2?}", preprocess_elapsed);

    let scores = self
      .model
      .infer(&tensor)
      .map_err(|e| RecognitionError::ClassificationUnavailable(Box::new(e)))?;
    if scores.len() != self.config.num_classes {
      return Err(RecognitionError::ScoreLengthMismatch {
        expected: self.config.num_classes,
        actual: scores.len(),
      });
    }
    let infer_elapsed = now.elapsed();
    debug!("推理完成，耗时: {:.2?}", infer_elapsed - preprocess_elapsed);

    let result = select_top_k(scores.as_slice(), request.top_k);
    info!(
      "识别完成: {} 个候选，耗时: {:.2?}",
      result.len(),
      now.elapsed()
    );

    Ok(result)
  }
}

impl<M> Model for RecognitionPipeline<M>
where
  M: Classifier,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  type Input = RecognitionRequest;
  type Output = RankedResult;
  type Error = RecognitionError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.recognize(input)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{model::ScoreVector, select::Candidate};
  use image::Rgb;

  /// 每个类别的分数为对应通道的均值
  struct ChannelMean {
    num_classes: usize,
  }

  impl Model for ChannelMean {
    type Input = ClassifierInput;
    type Output = ScoreVector;
    type Error = std::io::Error;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      let data = input.as_ref();
      let pixels = (data.len() / 3) as f32;
      let scores = (0..self.num_classes)
        .map(|class| {
          let channel = class % 3;
          data.iter().skip(channel).step_by(3).sum::<f32>() / pixels
        })
        .collect::<Vec<_>>();
      Ok(ScoreVector::from(scores))
    }
  }

  struct Unavailable;

  impl Model for Unavailable {
    type Input = ClassifierInput;
    type Output = ScoreVector;
    type Error = std::io::Error;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Err(std::io::Error::new(std::io::ErrorKind::NotFound, "模型资源缺失"))
    }
  }

  fn config(num_classes: usize) -> PipelineConfig {
    PipelineConfig {
      num_classes,
      ..Default::default()
    }
  }

  #[test]
  fn uniform_red_ranks_red_classes_first() {
    let pipeline = RecognitionPipeline::new(ChannelMean { num_classes: 6 }, config(6));
    let request = RecognitionRequest::new(RgbImage::from_pixel(64, 64, Rgb([255, 0, 0])), 3);

    let result = pipeline.recognize(&request).unwrap();
    assert_eq!(
      result.items.as_ref(),
      &[
        Candidate {
          class_id: 0,
          score: 1.0
        },
        Candidate {
          class_id: 3,
          score: 1.0
        },
        Candidate {
          class_id: 1,
          score: 0.0
        },
      ]
    );
  }

  #[test]
  fn model_failure_surfaces_as_classification_unavailable() {
    let pipeline = RecognitionPipeline::new(Unavailable, config(4));
    let request = RecognitionRequest::new(RgbImage::new(8, 8), 2);

    let err = pipeline.recognize(&request).unwrap_err();
    assert!(matches!(err, RecognitionError::ClassificationUnavailable(_)));
    assert!(err.is_classification_unavailable());
  }

  #[test]
  fn wrong_score_length_is_rejected() {
    let pipeline = RecognitionPipeline::new(ChannelMean { num_classes: 5 }, config(509));
    let request = RecognitionRequest::new(RgbImage::new(8, 8), 2);

    let err = pipeline.recognize(&request).unwrap_err();
    assert!(matches!(
      err,
      RecognitionError::ScoreLengthMismatch {
        expected: 509,
        actual: 5
      }
    ));
  }

  #[test]
  fn invalid_crop_fails_before_classification() {
    let pipeline = RecognitionPipeline::new(Unavailable, config(4));
    let request =
      RecognitionRequest::new(RgbImage::new(16, 16), 2).with_crop(CropRegion::new(8, 16));

    let err = pipeline.recognize(&request).unwrap_err();
    assert!(matches!(
      err,
      RecognitionError::Preprocess(PreprocessError::CropOutOfBounds { .. })
    ));
    assert!(!err.is_classification_unavailable());
  }

  #[test]
  fn non_square_image_is_rejected() {
    let pipeline = RecognitionPipeline::new(ChannelMean { num_classes: 3 }, config(3));
    let request = RecognitionRequest::new(RgbImage::new(20, 10), 1);

    assert!(matches!(
      pipeline.infer(&request),
      Err(RecognitionError::Preprocess(PreprocessError::NotSquare { .. }))
    ));
  }
}
