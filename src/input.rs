// 该文件是 Gungeon Recognizer 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tracing::error;

use crate::{
  FromUrl, FromUrlWithScheme,
  pipeline::RecognitionRequest,
  preprocess::CropRegion,
};

mod folder;
mod read_image_file;
mod viewfinder;

pub use self::folder::{FolderInput, FolderInputError};
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};
pub use self::viewfinder::{MAX_VIEWFINDER_RATIO, MIN_VIEWFINDER_RATIO, Viewfinder, ViewfinderError};

/// 采集到的一帧原始图像
#[derive(Debug, Clone)]
pub struct CapturedFrame {
  pub image: RgbImage,
  pub index: usize,
  pub source: PathBuf,
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Folder input error: {0}")]
  FolderInputError(#[from] FolderInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  Folder(FolderInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      FolderInput::SCHEME => Ok(InputWrapper::Folder(FolderInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = CapturedFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      InputWrapper::Folder(input) => input.next(),
    }
  }
}

/// 由采集帧构造识别请求的参数
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
  pub viewfinder: Viewfinder,
  /// 为空时裁剪整幅取景图像
  pub crop: Option<CropRegion>,
  pub top_k: usize,
}

impl CaptureOptions {
  pub fn request(&self, frame: CapturedFrame) -> Result<RecognitionRequest, ViewfinderError> {
    let square = self.viewfinder.capture(&frame.image)?;
    let request = RecognitionRequest::new(square, self.top_k).with_source(frame.source);
    Ok(match self.crop {
      Some(crop) => request.with_crop(crop),
      None => request,
    })
  }
}

pub trait IntoRequests: Iterator<Item = CapturedFrame> + Sized {
  /// 逐帧取景并生成识别请求，无法取景的帧记录日志后跳过
  fn into_requests(self, options: CaptureOptions) -> Requests<Self> {
    Requests {
      frames: self,
      options,
    }
  }
}

impl<I: Iterator<Item = CapturedFrame>> IntoRequests for I {}

pub struct Requests<I> {
  frames: I,
  options: CaptureOptions,
}

impl<I: Iterator<Item = CapturedFrame>> Iterator for Requests<I> {
  type Item = RecognitionRequest;

  fn next(&mut self) -> Option<Self::Item> {
    for frame in self.frames.by_ref() {
      let source = frame.source.clone();
      match self.options.request(frame) {
        Ok(request) => return Some(request),
        Err(e) => error!("无法从 {} 取景: {}", source.display(), e),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn frame(width: u32, height: u32) -> CapturedFrame {
    CapturedFrame {
      image: RgbImage::new(width, height),
      index: 0,
      source: PathBuf::from(format!("{}x{}.png", width, height)),
    }
  }

  #[test]
  fn requests_skip_frames_that_cannot_be_framed() {
    let options = CaptureOptions {
      viewfinder: Viewfinder::new(Some(0.5)).unwrap(),
      crop: Some(CropRegion::new(2, 10)),
      top_k: 4,
    };
    let frames = vec![frame(1, 1), frame(64, 48)];

    let requests: Vec<_> = frames.into_iter().into_requests(options).collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].image.dimensions(), (24, 24));
    assert_eq!(requests[0].crop, CropRegion::new(2, 10));
    assert_eq!(requests[0].top_k, 4);
    assert_eq!(requests[0].source, Some(PathBuf::from("64x48.png")));
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}
