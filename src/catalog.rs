// 该文件是 Gungeon Recognizer 项目的一部分。
// src/catalog.rs - 物品目录
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

use std::{borrow::Cow, path::Path};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("目录格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 类别编号到物品名称的对照表，仅用于展示
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
  names: Vec<String>,
}

impl Catalog {
  /// 读取 JSON 字符串数组，下标即类别编号
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let catalog = Self::from_json_str(&content)?;
    info!("加载物品目录 {}: {} 项", path.display(), catalog.len());
    Ok(catalog)
  }

  pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
    let names: Vec<String> = serde_json::from_str(content)?;
    Ok(Self { names })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  /// 目录中没有的编号显示为 `#<id>`
  pub fn label(&self, class_id: u32) -> Cow<'_, str> {
    match self.name(class_id) {
      Some(name) => Cow::Borrowed(name),
      None => Cow::Owned(format!("#{}", class_id)),
    }
  }
}

impl From<Vec<String>> for Catalog {
  fn from(names: Vec<String>) -> Self {
    Self { names }
  }
}
