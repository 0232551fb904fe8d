// 该文件是 Gungeon Recognizer 项目的一部分。
// src/equalize.rs - 明度通道直方图均衡化
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

//! 基于经验累积分布的 V 通道重映射。
//!
//! 记 N 为像素总数，对排序后的 V 值：
//! - `min_cdf` 为第一个与最小值不同的值所在的 1 起始排名；
//! - 每个像素的 `pix_cdf` 为第一个严格大于该像素 V 值的 1 起始排名，不存在时为 N；
//! - 新值为 `(pix_cdf - min_cdf) / (N - min_cdf)`。
//!
//! 分母为 0 时视为退化图像，原样保留。

use tracing::{debug, warn};

use crate::frame::HsvImage;

/// 均衡化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equalization {
  Applied { min_cdf: usize },
  /// 所有像素明度相同（或只有最大值一档不同），未做任何修改
  Degenerate,
}

impl Equalization {
  pub fn is_degenerate(&self) -> bool {
    matches!(self, Equalization::Degenerate)
  }
}

/// 在升序数组上求 `min_cdf`，退化时返回 `None`
pub fn min_cdf(sorted: &[f32]) -> Option<usize> {
  let first = *sorted.first()?;
  let index = sorted.iter().position(|v| *v != first)?;
  let rank = index + 1;
  if rank >= sorted.len() {
    None
  } else {
    Some(rank)
  }
}

/// 二分查找第一个严格大于 `value` 的 1 起始排名
pub fn pixel_cdf(sorted: &[f32], value: f32) -> usize {
  let above = sorted.partition_point(|v| *v <= value);
  (above + 1).min(sorted.len())
}

/// 原地均衡化一组明度值
pub fn equalize_values(values: &mut [f32]) -> Equalization {
  let mut sorted = values.to_vec();
  sorted.sort_by(f32::total_cmp);

  let Some(min_cdf) = min_cdf(&sorted) else {
    return Equalization::Degenerate;
  };

  let total = sorted.len();
  let denominator = (total - min_cdf) as f32;
  for value in values.iter_mut() {
    let cdf = pixel_cdf(&sorted, *value);
    *value = (cdf.saturating_sub(min_cdf) as f32 / denominator).clamp(0.0, 1.0);
  }

  Equalization::Applied { min_cdf }
}

/// 对整幅 HSV 图像的 V 通道做均衡化，H 与 S 保持不变
pub fn equalize_hsv(image: &mut HsvImage) -> Equalization {
  let mut values: Vec<f32> = image.pixels().iter().map(|p| p.v).collect();
  let outcome = equalize_values(&mut values);

  match outcome {
    Equalization::Applied { min_cdf } => {
      for (pixel, v) in image.pixels_mut().iter_mut().zip(values) {
        pixel.v = v;
      }
      debug!(
        "直方图均衡化完成: {}x{}, min_cdf = {}",
        image.width(),
        image.height(),
        min_cdf
      );
    }
    Equalization::Degenerate => {
      warn!(
        "图像明度分布退化 ({}x{}), 跳过直方图均衡化",
        image.width(),
        image.height()
      );
    }
  }

  outcome
}
