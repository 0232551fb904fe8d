// 该文件是 Gungeon Recognizer 项目的一部分。
// src/preprocess.rs - 分类器输入预处理
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

use clap::ValueEnum;
use image::{
  RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::debug;

use crate::{
  equalize::{Equalization, equalize_hsv},
  frame::{HsvImage, InputTensor, RGB_CHANNELS},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("输入图像不是正方形: {width}x{height}")]
  NotSquare { width: u32, height: u32 },
  #[error("裁剪边长为 0")]
  EmptyCrop,
  #[error("裁剪区域越界: 起点 ({start}, {start}), 边长 {edge}, 图像 {width}x{height}")]
  CropOutOfBounds {
    start: u32,
    edge: u32,
    width: u32,
    height: u32,
  },
}

/// 以 `(start, start)` 为左上角、边长为 `edge` 的正方形裁剪区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
  pub start: u32,
  pub edge: u32,
}

impl CropRegion {
  pub fn new(start: u32, edge: u32) -> Self {
    Self { start, edge }
  }

  /// 覆盖整幅图像的裁剪区域
  pub fn full(image: &RgbImage) -> Self {
    Self {
      start: 0,
      edge: image.width().min(image.height()),
    }
  }

  /// 越界直接拒绝，不做钳制
  pub fn check(&self, width: u32, height: u32) -> Result<(), PreprocessError> {
    if self.edge == 0 {
      return Err(PreprocessError::EmptyCrop);
    }

    let out_of_bounds = || PreprocessError::CropOutOfBounds {
      start: self.start,
      edge: self.edge,
      width,
      height,
    };
    let end = self.start.checked_add(self.edge).ok_or_else(out_of_bounds)?;
    if end > width || end > height {
      return Err(out_of_bounds());
    }
    Ok(())
  }
}

/// 缩放采样方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResizeFilter {
  /// 最近邻，与训练时一致
  #[default]
  Nearest,
  Bilinear,
}

impl From<ResizeFilter> for FilterType {
  fn from(filter: ResizeFilter) -> Self {
    match filter {
      ResizeFilter::Nearest => FilterType::Nearest,
      ResizeFilter::Bilinear => FilterType::Triangle,
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor {
  filter: ResizeFilter,
}

impl Preprocessor {
  pub fn new(filter: ResizeFilter) -> Self {
    Self { filter }
  }

  pub fn filter(&self) -> ResizeFilter {
    self.filter
  }

  /// RGB → HSV → V 通道均衡化 → RGB，作用于原始分辨率
  pub fn equalize(&self, image: &RgbImage) -> (RgbImage, Equalization) {
    let mut hsv = HsvImage::from_rgb(image);
    match equalize_hsv(&mut hsv) {
      Equalization::Degenerate => (image.clone(), Equalization::Degenerate),
      outcome => (hsv.to_rgb(), outcome),
    }
  }

  /// 均衡化、裁剪并缩放到 `W x H`，输出归一化张量
  pub fn preprocess<const W: u32, const H: u32>(
    &self,
    image: &RgbImage,
    crop: CropRegion,
  ) -> Result<InputTensor<W, H>, PreprocessError> {
    let (width, height) = image.dimensions();
    if width != height {
      return Err(PreprocessError::NotSquare { width, height });
    }
    crop.check(width, height)?;

    let (equalized, outcome) = self.equalize(image);
    debug!("均衡化结果: {:?}", outcome);

    let cropped =
      imageops::crop_imm(&equalized, crop.start, crop.start, crop.edge, crop.edge).to_image();
    let scaled = imageops::resize(&cropped, W, H, self.filter.into());

    Ok(to_tensor(&scaled))
  }
}

/// 按 行 = y、列 = x 的约定写入张量，各通道除以 255
pub fn to_tensor<const W: u32, const H: u32>(image: &RgbImage) -> InputTensor<W, H> {
  let mut tensor = InputTensor::<W, H>::default();
  for y in 0..H {
    for x in 0..W {
      let pixel = image.get_pixel(x, y);
      for c in 0..RGB_CHANNELS {
        tensor.set(y as usize, x as usize, c, pixel[c] as f32 / 255.0);
      }
    }
  }
  tensor
}
