//! ndarray (H, W, C) 配列と OpenCV Mat の相互変換、および Mat 上の画像処理
//!
//! 推論の前処理（フレーム縮小）と後処理（出力マップの拡大・平滑化）で共通に使う。

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use opencv::{
    core::{AlgorithmHint, Mat, Rect, Size, BORDER_REFLECT},
    imgproc,
    prelude::*,
};

use crate::error::{PipelineError, Result};

/// 倍率指定時の出力長（`cv::resize` と同じく偶数丸め）
pub fn scaled_len(len: usize, factor: f64) -> usize {
    (len as f64 * factor).round_ties_even().max(0.0) as usize
}

/// (H, W, C) の f32 配列を C チャンネルの Mat (CV_32FC{C}) にコピー
pub fn to_mat(src: ArrayView3<f32>) -> Result<Mat> {
    let (h, w, c) = src.dim();
    if h == 0 || w == 0 || c == 0 {
        return Err(PipelineError::EmptyFrame);
    }
    let data: Vec<f32> = src.iter().copied().collect();
    let flat = Mat::from_slice(&data)?;
    Ok(flat.reshape(c as i32, h as i32)?.try_clone()?)
}

/// CV_32F の Mat を (rows, cols, channels) の配列にコピー
pub fn from_mat(mat: &Mat) -> Result<Array3<f32>> {
    let rows = mat.rows() as usize;
    let cols = mat.cols() as usize;
    let channels = mat.channels() as usize;

    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    let flat = mat.reshape(1, 1)?;
    let data = flat.data_typed::<f32>()?.to_vec();
    Array3::from_shape_vec((rows, cols, channels), data).map_err(|e| PipelineError::Image(e.to_string()))
}

/// 倍率を指定してリサイズ（`INTER_LINEAR`）
pub fn resize_by(src: &Mat, factor: f64) -> Result<Mat> {
    let mut dst = Mat::default();
    imgproc::resize(src, &mut dst, Size::default(), factor, factor, imgproc::INTER_LINEAR)?;
    Ok(dst)
}

/// 出力サイズを指定してリサイズ（`INTER_LINEAR`）
pub fn resize_to(src: &Mat, height: usize, width: usize) -> Result<Mat> {
    let mut dst = Mat::default();
    imgproc::resize(
        src,
        &mut dst,
        Size::new(width as i32, height as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(dst)
}

/// 左上から height x width を切り出す
pub fn crop_top_left(src: &Mat, height: usize, width: usize) -> Result<Mat> {
    let roi = Mat::roi(src, Rect::new(0, 0, width as i32, height as i32))?;
    Ok(roi.try_clone()?)
}

/// 1チャンネルのガウシアン平滑化。カーネル半径は `truncate * sigma`、端は鏡映（d c b a | a b c d）
pub fn gaussian_blur(map: ArrayView2<f32>, sigma: f64, truncate: f64) -> Result<Array2<f32>> {
    let radius = (truncate * sigma + 0.5) as i32;
    let ksize = 2 * radius + 1;

    let src = to_mat(map.insert_axis(Axis(2)))?;
    let mut dst = Mat::default();
    imgproc::gaussian_blur(
        &src,
        &mut dst,
        Size::new(ksize, ksize),
        sigma,
        sigma,
        BORDER_REFLECT,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(from_mat(&dst)?.index_axis_move(Axis(2), 0))
}
