// 该文件是 Gungeon Recognizer 项目的一部分。
// src/output/draw.rs - 识别结果可视化与记录
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

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use serde_json::{Value, json};

use crate::{catalog::Catalog, pipeline::RecognitionRequest, select::RankedResult};

const CROP_BORDER_THICKNESS: u32 = 2;
const CROP_BORDER_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色

pub struct Draw {
  thickness: u32,
  color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: CROP_BORDER_THICKNESS,
      color: CROP_BORDER_COLOR,
    }
  }
}

impl Draw {
  /// 在请求图像上画出送入分类器的裁剪正方形
  pub fn draw_crop(&self, request: &RecognitionRequest) -> RgbImage {
    let mut image = request.image.clone();
    let crop = request.crop;
    for t in 0..self.thickness {
      // 边框向内收，越过图像边界的部分由 imageproc 裁掉
      let edge = crop.edge.saturating_sub(2 * t);
      if edge == 0 {
        break;
      }
      let origin = (crop.start + t) as i32;
      let rect = Rect::at(origin, origin).of_size(edge, edge);
      draw_hollow_rect_mut(&mut image, rect, Rgb(self.color));
    }
    image
  }
}

/// 候选列表的 JSON 记录
pub fn shortlist_json(
  request: &RecognitionRequest,
  result: &RankedResult,
  catalog: &Catalog,
  image_path: Option<&Path>,
) -> Value {
  let items: Vec<Value> = result
    .iter()
    .enumerate()
    .map(|(rank, c)| {
      json!({
        "rank": rank + 1,
        "class_id": c.class_id,
        "name": catalog.label(c.class_id),
        "score": c.score,
      })
    })
    .collect();

  json!({
    "source": request.source.as_ref().map(|p| p.display().to_string()),
    "image": image_path.map(|p| p.display().to_string()),
    "crop": { "start": request.crop.start, "edge": request.crop.edge },
    "top_k": request.top_k,
    "items": items,
  })
}
