// 该文件是 Gungeon Recognizer 项目的一部分。
// src/frame.rs - HSV 工作缓冲与 NHWC 输入张量定义
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

use image::RgbImage;

use crate::color::{Hsv, hsv_to_rgb, rgb_to_hsv};

pub const RGB_CHANNELS: usize = 3;

/// 分类器输入边长
pub const CLASSIFIER_INPUT_EDGE: u32 = 32;

/// 当前物品目录所用模型的输入张量
pub type ClassifierInput = InputTensor<CLASSIFIER_INPUT_EDGE, CLASSIFIER_INPUT_EDGE>;

/// 单次识别请求独占的 HSV 工作副本，按行优先存储
#[derive(Debug, Clone)]
pub struct HsvImage {
  width: u32,
  height: u32,
  pixels: Box<[Hsv]>,
}

impl HsvImage {
  pub fn from_rgb(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let pixels = image.pixels().map(|p| rgb_to_hsv(*p)).collect();
    Self {
      width,
      height,
      pixels,
    }
  }

  pub fn to_rgb(&self) -> RgbImage {
    RgbImage::from_fn(self.width, self.height, |x, y| {
      hsv_to_rgb(self.pixels[self.index(x, y)])
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn len(&self) -> usize {
    self.pixels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pixels.is_empty()
  }

  pub fn get(&self, x: u32, y: u32) -> Hsv {
    self.pixels[self.index(x, y)]
  }

  pub fn pixels(&self) -> &[Hsv] {
    &self.pixels
  }

  pub fn pixels_mut(&mut self) -> &mut [Hsv] {
    &mut self.pixels
  }

  fn index(&self, x: u32, y: u32) -> usize {
    y as usize * self.width as usize + x as usize
  }
}

/// `[1][H][W][3]` 布局的归一化浮点张量，行对应图像 y 轴，列对应 x 轴
#[derive(Debug, Clone)]
pub struct InputTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> Default for InputTensor<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0f32; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> From<Vec<f32>> for InputTensor<W, H> {
  fn from(data: Vec<f32>) -> Self {
    if data.len() != (RGB_CHANNELS * W as usize * H as usize) {
      panic!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        RGB_CHANNELS * W as usize * H as usize,
        data.len()
      );
    }

    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> InputTensor<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn shape(&self) -> [usize; 4] {
    [1, H as usize, W as usize, RGB_CHANNELS]
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn get(&self, row: usize, col: usize, channel: usize) -> f32 {
    self.data[Self::offset(row, col, channel)]
  }

  pub fn set(&mut self, row: usize, col: usize, channel: usize, value: f32) {
    self.data[Self::offset(row, col, channel)] = value;
  }

  /// 所有元素均为有限值
  pub fn is_finite(&self) -> bool {
    self.data.iter().all(|v| v.is_finite())
  }

  fn offset(row: usize, col: usize, channel: usize) -> usize {
    (row * W as usize + col) * RGB_CHANNELS + channel
  }
}

impl<const W: u32, const H: u32> AsRef<[f32]> for InputTensor<W, H> {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for InputTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}
