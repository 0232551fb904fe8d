// 该文件是 Gungeon Recognizer 项目的一部分。
// src/output/log_output.rs - 日志输出
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  catalog::{Catalog, CatalogError},
  output::{Render, catalog_from_url},
  pipeline::RecognitionRequest,
  select::RankedResult,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("物品目录错误: {0}")]
  CatalogError(#[from] CatalogError),
}

/// 把候选列表逐行写进日志
pub struct LogOutput {
  catalog: Catalog,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }

    Ok(LogOutput {
      catalog: catalog_from_url(url)?.unwrap_or_default(),
    })
  }
}

impl LogOutput {
  pub fn lines(&self, result: &RankedResult) -> Vec<String> {
    result
      .iter()
      .enumerate()
      .map(|(rank, c)| {
        format!(
          "{:>2}. {} (类别 {}, 分数 {:.4})",
          rank + 1,
          self.catalog.label(c.class_id),
          c.class_id,
          c.score
        )
      })
      .collect()
  }
}

impl Render<RecognitionRequest, RankedResult> for LogOutput {
  type Error = LogOutputError;

  fn render_result(
    &self,
    frame: &RecognitionRequest,
    result: &RankedResult,
  ) -> Result<(), Self::Error> {
    let source = frame
      .source
      .as_ref()
      .map(|p| p.display().to_string())
      .unwrap_or_else(|| "<内存>".to_string());
    info!("{} 的识别结果，共 {} 项", source, result.len());
    for line in self.lines(result) {
      info!("{}", line);
    }
    Ok(())
  }
}
