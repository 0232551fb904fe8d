// 该文件是 Gungeon Recognizer 项目的一部分。
// src/color.rs - RGB/HSV 颜色空间转换
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

use image::Rgb;

/// HSV 像素
///
/// - `h`: 色相，单位为度，范围 [0, 360)
/// - `s`: 饱和度，范围 [0, 1]
/// - `v`: 明度，范围 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
  pub h: f32,
  pub s: f32,
  pub v: f32,
}

impl Hsv {
  pub fn new(h: f32, s: f32, v: f32) -> Self {
    Self { h, s, v }
  }
}

/// RGB 转 HSV，对全部合法输入都有定义
pub fn rgb_to_hsv(rgb: Rgb<u8>) -> Hsv {
  let [r, g, b] = rgb.0;
  let max = r.max(g).max(b);
  let min = r.min(g).min(b);
  let delta = (max - min) as f32;

  let v = max as f32 / 255.0;
  if max == min {
    return Hsv::new(0.0, 0.0, v);
  }

  let s = delta / max as f32;
  let (r, g, b) = (r as f32, g as f32, b as f32);
  let sector = if r == max as f32 {
    (g - b) / delta
  } else if g == max as f32 {
    2.0 + (b - r) / delta
  } else {
    4.0 + (r - g) / delta
  };

  let mut h = sector * 60.0;
  if h < 0.0 {
    h += 360.0;
  }

  Hsv::new(h, s, v)
}

/// HSV 转 RGB，`s` 与 `v` 会先被限制到 [0, 1]
pub fn hsv_to_rgb(hsv: Hsv) -> Rgb<u8> {
  let s = hsv.s.clamp(0.0, 1.0);
  let v = hsv.v.clamp(0.0, 1.0);
  let v_scaled = to_channel(v);

  if s <= 0.0 {
    return Rgb([v_scaled, v_scaled, v_scaled]);
  }

  // 超出 [0, 360) 的色相按 0 处理
  let hx = if hsv.h < 0.0 || hsv.h >= 360.0 || hsv.h.is_nan() {
    0.0
  } else {
    hsv.h / 60.0
  };
  let sector = hx.floor();
  let f = hx - sector;

  let p = to_channel((1.0 - s) * v);
  let q = to_channel((1.0 - s * f) * v);
  let t = to_channel((1.0 - s * (1.0 - f)) * v);

  let rgb = match sector as u8 {
    0 => [v_scaled, t, p],
    1 => [q, v_scaled, p],
    2 => [p, v_scaled, t],
    3 => [p, q, v_scaled],
    4 => [t, p, v_scaled],
    _ => [v_scaled, p, q],
  };

  Rgb(rgb)
}

#[inline]
fn to_channel(x: f32) -> u8 {
  (x * 255.0).round().clamp(0.0, 255.0) as u8
}
