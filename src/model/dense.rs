// 该文件是 Gungeon Recognizer 项目的一部分。
// src/model/dense.rs - 全连接打分头
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

use candle_core::{DType, Device, Tensor};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ClassifierInput,
  model::{Model, ModelError, ScoreVector},
};

const WEIGHT_KEY: &str = "weight";
const BIAS_KEY: &str = "bias";

/// `scores = W · x + b`，权重来自 safetensors 文件
pub struct DenseClassifier {
  // [features, num_classes]
  weight_t: Tensor,
  bias: Tensor,
  num_classes: usize,
  device: Device,
}

pub struct DenseClassifierBuilder {
  model_path: String,
  device: Device,
}

impl FromUrlWithScheme for DenseClassifierBuilder {
  const SCHEME: &'static str = "dense";
}

impl FromUrl for DenseClassifierBuilder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(DenseClassifierBuilder {
      model_path: url.path().to_string(),
      device: Device::Cpu,
    })
  }
}

impl DenseClassifierBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      device: Device::Cpu,
    }
  }

  pub fn device(mut self, device: Device) -> Self {
    self.device = device;
    self
  }

  pub fn build(self) -> Result<DenseClassifier, ModelError> {
    info!("加载模型文件: {}", self.model_path);
    let mut tensors = candle_core::safetensors::load(&self.model_path, &self.device)?;
    debug!("模型包含 {} 个张量", tensors.len());

    let weight = tensors
      .remove(WEIGHT_KEY)
      .ok_or_else(|| ModelError::invalid(format!("缺少 {} 张量", WEIGHT_KEY)))?;
    let bias = tensors
      .remove(BIAS_KEY)
      .ok_or_else(|| ModelError::invalid(format!("缺少 {} 张量", BIAS_KEY)))?;

    let model = DenseClassifier::from_tensors(weight, bias)?;
    info!("模型加载完成，类别数: {}", model.num_classes());
    Ok(model)
  }
}

impl DenseClassifier {
  /// `weight` 形状为 `[num_classes, H·W·3]`，`bias` 形状为 `[num_classes]`
  pub fn from_tensors(weight: Tensor, bias: Tensor) -> Result<Self, ModelError> {
    let features = ClassifierInput::default().len();
    let (num_classes, weight_features) = weight.dims2()?;
    if weight_features != features {
      error!(
        "预期权重特征维度为 {}, 实际为 {}",
        features, weight_features
      );
      return Err(ModelError::invalid(format!(
        "预期权重特征维度为 {}, 实际为 {}",
        features, weight_features
      )));
    }

    let bias_len = bias.dims1()?;
    if bias_len != num_classes {
      error!("偏置长度 {} 与类别数 {} 不一致", bias_len, num_classes);
      return Err(ModelError::invalid(format!(
        "偏置长度 {} 与类别数 {} 不一致",
        bias_len, num_classes
      )));
    }

    let device = weight.device().clone();
    Ok(Self {
      weight_t: weight.to_dtype(DType::F32)?.t()?.contiguous()?,
      bias: bias.to_dtype(DType::F32)?,
      num_classes,
      device,
    })
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }
}

impl Model for DenseClassifier {
  type Input = ClassifierInput;
  type Output = ScoreVector;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let x = Tensor::from_slice(input.as_ref(), (1, input.len()), &self.device)?;

    debug!("执行模型推理");
    let y = x.matmul(&self.weight_t)?.broadcast_add(&self.bias)?;
    let scores = y.squeeze(0)?.to_vec1::<f32>()?;

    Ok(ScoreVector::from(scores))
  }
}
