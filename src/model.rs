// 该文件是 Gungeon Recognizer 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, frame::ClassifierInput};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 分类器：输入固定形状张量，输出每个类别一个分数
pub trait Classifier: Model<Input = ClassifierInput, Output = ScoreVector> {}

impl<T: Model<Input = ClassifierInput, Output = ScoreVector>> Classifier for T {}

/// 按类别编号排列的原始分数，只用于相对排序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreVector {
  scores: Box<[f32]>,
}

impl From<Vec<f32>> for ScoreVector {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

impl ScoreVector {
  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.scores
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[cfg(any(feature = "model_dense", feature = "model_onnx"))]
  #[error("Candle 错误: {0}")]
  CandleError(#[from] candle_core::Error),
}

impl ModelError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    ModelError::ModelInvalid(msg.into())
  }
}

#[cfg(feature = "model_dense")]
mod dense;
#[cfg(feature = "model_dense")]
pub use self::dense::{DenseClassifier, DenseClassifierBuilder};

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxClassifier, OnnxClassifierBuilder};

pub enum ModelWrapper {
  #[cfg(feature = "model_dense")]
  Dense(DenseClassifier),
  #[cfg(feature = "model_onnx")]
  Onnx(OnnxClassifier),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "model_dense")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == DenseClassifierBuilder::SCHEME {
        let model = DenseClassifierBuilder::from_url(url)?.build()?;
        return Ok(ModelWrapper::Dense(model));
      }
    }
    #[cfg(feature = "model_onnx")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == OnnxClassifierBuilder::SCHEME {
        let model = OnnxClassifierBuilder::from_url(url)?.build()?;
        return Ok(ModelWrapper::Onnx(model));
      }
    }
    Err(ModelError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl ModelWrapper {
  /// 模型声明的类别数，无法从模型得知时为 `None`
  pub fn num_classes(&self) -> Option<usize> {
    match self {
      #[cfg(feature = "model_dense")]
      ModelWrapper::Dense(model) => Some(model.num_classes()),
      #[cfg(feature = "model_onnx")]
      ModelWrapper::Onnx(_) => None,
      #[cfg(not(any(feature = "model_dense", feature = "model_onnx")))]
      _ => match *self {},
    }
  }
}

impl Model for ModelWrapper {
  type Input = ClassifierInput;
  type Output = ScoreVector;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      #[cfg(feature = "model_dense")]
      ModelWrapper::Dense(model) => model.infer(input),
      #[cfg(feature = "model_onnx")]
      ModelWrapper::Onnx(model) => model.infer(input),
      #[cfg(not(any(feature = "model_dense", feature = "model_onnx")))]
      _ => {
        let _ = input;
        match *self {}
      }
    }
  }
}
