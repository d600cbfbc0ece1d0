use anyhow::{Context, Result};
use opencv::{
    core::{Mat, CV_32FC3},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait},
};
use std::path::Path;
use tracing::{debug, warn};

use crate::pose::image::from_mat;
use crate::pose::Frame;

/// 動画ファイルから BGR フレームを順に読む
///
/// 終端または読み込み失敗でイテレーションを終える。
pub struct VideoFrames {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl VideoFrames {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_str().context("Video path is not valid UTF-8")?;
        let capture = VideoCapture::from_file(name, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {}", path.display()))?;

        if !capture.is_opened()? {
            anyhow::bail!("Video {} could not be opened", path.display());
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        debug!("video {}: {}x{} @ {:.1} fps", path.display(), width, height, fps);

        Ok(Self {
            capture,
            width,
            height,
        })
    }

    /// 解像度を取得
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 次のフレーム。終端なら None
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        let ok = self.capture.read(&mut mat).context("Failed to read frame")?;
        if !ok || mat.empty() {
            return Ok(None);
        }
        mat_to_frame(&mat).map(Some)
    }
}

impl Iterator for VideoFrames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        match self.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("stopping at unreadable frame: {:#}", e);
                None
            }
        }
    }
}

/// 8bit BGR の Mat を (H, W, 3) の f32 配列に変換
pub fn mat_to_frame(mat: &Mat) -> Result<Frame> {
    let mut float_mat = Mat::default();
    mat.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;
    Ok(from_mat(&float_mat)?)
}
