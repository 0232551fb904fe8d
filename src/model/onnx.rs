// 该文件是 Gungeon Recognizer 项目的一部分。
// src/model/onnx.rs - ONNX 分类网络
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

use std::collections::HashMap;

use candle_core::{Device, Tensor};
use candle_onnx::onnx::ModelProto;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ClassifierInput,
  model::{Model, ModelError, ScoreVector},
};

const ONNX_NUM_INPUTS: usize = 1;

pub struct OnnxClassifier {
  model: ModelProto,
  input_name: String,
  output_name: String,
}

pub struct OnnxClassifierBuilder {
  model_path: String,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(OnnxClassifierBuilder {
      model_path: url.path().to_string(),
    })
  }
}

impl OnnxClassifierBuilder {
  pub fn build(self) -> Result<OnnxClassifier, ModelError> {
    info!("加载模型文件: {}", self.model_path);
    let model = candle_onnx::read_file(&self.model_path)?;

    let graph = model
      .graph
      .as_ref()
      .ok_or_else(|| ModelError::invalid("模型缺少计算图"))?;

    if graph.input.len() != ONNX_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS,
        graph.input.len()
      );
      return Err(ModelError::invalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS,
        graph.input.len()
      )));
    }

    let input_name = graph.input[0].name.clone();
    let output_name = graph
      .output
      .first()
      .map(|o| o.name.clone())
      .ok_or_else(|| ModelError::invalid("模型没有输出"))?;

    debug!("模型输入: {}", input_name);
    debug!("模型输出: {}", output_name);
    info!("模型加载完成");

    Ok(OnnxClassifier {
      model,
      input_name,
      output_name,
    })
  }
}

impl Model for OnnxClassifier {
  type Input = ClassifierInput;
  type Output = ScoreVector;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let [n, h, w, c] = input.shape();
    let x = Tensor::from_slice(input.as_ref(), (n, h, w, c), &Device::Cpu)?;
    let inputs = HashMap::from([(self.input_name.clone(), x)]);

    debug!("执行模型推理");
    let mut outputs = candle_onnx::simple_eval(&self.model, inputs)?;

    let y = outputs
      .remove(&self.output_name)
      .ok_or_else(|| ModelError::invalid(format!("缺少输出 {}", self.output_name)))?;
    let scores = y.flatten_all()?.to_vec1::<f32>()?;

    Ok(ScoreVector::from(scores))
  }
}
