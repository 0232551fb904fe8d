// 该文件是 Gungeon Recognizer 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  catalog::{Catalog, CatalogError},
  output::{Render, catalog_from_url, draw::{Draw, shortlist_json}},
  pipeline::RecognitionRequest,
  select::RankedResult,
};

/// 保存画出裁剪框的图像，同名 `.json` 文件记录候选列表
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
  catalog: Catalog,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("物品目录错误: {0}")]
  CatalogError(#[from] CatalogError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: PathBuf::from(uri.path()),
      draw: Draw::default(),
      catalog: catalog_from_url(uri)?.unwrap_or_default(),
    })
  }
}

impl SaveImageFileOutput {
  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save(&self, request: &RecognitionRequest, result: &RankedResult) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    self.draw.draw_crop(request).save(&self.path)?;

    let record = shortlist_json(request, result, &self.catalog, Some(&self.path));
    std::fs::write(
      self.path.with_extension("json"),
      serde_json::to_string_pretty(&record)?,
    )?;

    warn!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<RecognitionRequest, RankedResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    frame: &RecognitionRequest,
    result: &RankedResult,
  ) -> Result<(), Self::Error> {
    self.save(frame, result)
  }
}
