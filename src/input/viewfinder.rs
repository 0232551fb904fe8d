// 该文件是 Gungeon Recognizer 项目的一部分。
// src/input/viewfinder.rs - 取景框
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

use image::{RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

pub const MIN_VIEWFINDER_RATIO: f64 = 0.2;
pub const MAX_VIEWFINDER_RATIO: f64 = 0.95;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewfinderError {
  #[error(
    "取景比例 {0} 超出范围 [{min}, {max}]",
    min = MIN_VIEWFINDER_RATIO,
    max = MAX_VIEWFINDER_RATIO
  )]
  InvalidRatio(f64),
  #[error("画面过小，无法取景: {width}x{height}")]
  EmptyFrame { width: u32, height: u32 },
}

/// 画面中央的正方形取景框
///
/// 给定比例时边长为短边乘以比例，否则取最大的居中正方形。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewfinder {
  ratio: Option<f64>,
}

impl Viewfinder {
  pub fn new(ratio: Option<f64>) -> Result<Self, ViewfinderError> {
    if let Some(r) = ratio
      && !(MIN_VIEWFINDER_RATIO..=MAX_VIEWFINDER_RATIO).contains(&r)
    {
      return Err(ViewfinderError::InvalidRatio(r));
    }
    Ok(Self { ratio })
  }

  pub fn ratio(&self) -> Option<f64> {
    self.ratio
  }

  /// 返回取景框左上角与边长 `(x, y, edge)`
  pub fn square(&self, width: u32, height: u32) -> Result<(u32, u32, u32), ViewfinderError> {
    let short = width.min(height);
    let edge = match self.ratio {
      Some(ratio) => (short as f64 * ratio) as u32,
      None => short,
    };
    if edge == 0 {
      return Err(ViewfinderError::EmptyFrame { width, height });
    }
    Ok(((width - edge) / 2, (height - edge) / 2, edge))
  }

  pub fn capture(&self, image: &RgbImage) -> Result<RgbImage, ViewfinderError> {
    let (width, height) = image.dimensions();
    let (x, y, edge) = self.square(width, height)?;
    debug!("取景: ({}, {}) 边长 {}，原图 {}x{}", x, y, edge, width, height);
    Ok(imageops::crop_imm(image, x, y, edge, edge).to_image())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn ratio_must_be_within_slider_range() {
    assert!(Viewfinder::new(None).is_ok());
    assert!(Viewfinder::new(Some(0.2)).is_ok());
    assert!(Viewfinder::new(Some(0.95)).is_ok());
    assert_eq!(
      Viewfinder::new(Some(0.1)),
      Err(ViewfinderError::InvalidRatio(0.1))
    );
    assert_eq!(
      Viewfinder::new(Some(1.0)),
      Err(ViewfinderError::InvalidRatio(1.0))
    );
  }

  #[test]
  fn square_is_centred_on_the_short_edge() {
    let full = Viewfinder::default();
    assert_eq!(full.square(640, 480), Ok((80, 0, 480)));
    assert_eq!(full.square(100, 100), Ok((0, 0, 100)));

    let half = Viewfinder::new(Some(0.5)).unwrap();
    assert_eq!(half.square(480, 640), Ok((120, 200, 240)));
  }

  #[test]
  fn capture_crops_the_centre() {
    let image = RgbImage::from_fn(6, 4, |x, _| Rgb([x as u8, 0, 0]));
    let square = Viewfinder::default().capture(&image).unwrap();
    assert_eq!(square.dimensions(), (4, 4));
    assert_eq!(square.get_pixel(0, 0)[0], 1);
    assert_eq!(square.get_pixel(3, 3)[0], 4);
  }

  #[test]
  fn tiny_frames_are_rejected() {
    let vf = Viewfinder::new(Some(0.2)).unwrap();
    assert_eq!(
      vf.square(4, 4),
      Err(ViewfinderError::EmptyFrame {
        width: 4,
        height: 4
      })
    );
  }
}
