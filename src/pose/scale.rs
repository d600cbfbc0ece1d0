use ndarray::{s, Array3, ArrayView3};

use super::image::{crop_top_left, from_mat, resize_by, resize_to, scaled_len, to_mat};
use crate::error::{PipelineError, Result};

/// 右・下方向に追加したパディング量（上・左には足さない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub down: usize,
    pub right: usize,
}

/// 1スケール分の推論入力
#[derive(Debug, Clone)]
pub struct ScaledInput {
    /// 縮小後にパディングした画像 (H', W', 3)
    pub image: Array3<f32>,
    pub padding: Padding,
    /// 適用した倍率
    pub scale: f64,
}

impl ScaledInput {
    /// パディング前の (高さ, 幅)
    pub fn unpadded_dim(&self) -> (usize, usize) {
        let (h, w, _) = self.image.dim();
        (h - self.padding.down, w - self.padding.right)
    }
}

/// 画像を stride の倍数になるよう右下にパディングする
pub fn pad_right_down(image: ArrayView3<f32>, stride: usize, pad_value: f32) -> (Array3<f32>, Padding) {
    let (h, w, c) = image.dim();
    let padding = Padding {
        down: if h % stride == 0 { 0 } else { stride - h % stride },
        right: if w % stride == 0 { 0 } else { stride - w % stride },
    };

    let mut padded = Array3::from_elem((h + padding.down, w + padding.right, c), pad_value);
    padded.slice_mut(s![..h, ..w, ..]).assign(&image);
    (padded, padding)
}

/// スケールごとの縮小＋パディングと、その逆変換
#[derive(Debug, Clone, Copy)]
pub struct ScaleNormalizer {
    stride: usize,
    pad_value: f32,
}

impl ScaleNormalizer {
    pub fn new(stride: usize, pad_value: u8) -> Self {
        Self {
            stride: stride.max(1),
            pad_value: f32::from(pad_value),
        }
    }

    /// フレームを `scale` 倍して stride 境界までパディングする
    ///
    /// 縮小後の面積が 0 になる倍率はエラー
    pub fn prepare(&self, frame: ArrayView3<f32>, scale: f64) -> Result<ScaledInput> {
        let (h, w, _) = frame.dim();
        if h == 0 || w == 0 {
            return Err(PipelineError::EmptyFrame);
        }
        if !(scale > 0.0) || scaled_len(h, scale) == 0 || scaled_len(w, scale) == 0 {
            return Err(PipelineError::InvalidScale {
                scale: scale as f32,
                height: h,
                width: w,
            });
        }

        let resized = from_mat(&resize_by(&to_mat(frame)?, scale)?)?;
        let (image, padding) = pad_right_down(resized.view(), self.stride, self.pad_value);
        Ok(ScaledInput {
            image,
            padding,
            scale,
        })
    }

    /// 推論出力 (h, w, C) を stride 倍に拡大し、パディング分を切り落として元フレームサイズに戻す
    ///
    /// 出力は入力のちょうど 1/stride の大きさでなければならない。
    pub fn restore(
        &self,
        name: &'static str,
        raw: ArrayView3<f32>,
        input: &ScaledInput,
        frame_h: usize,
        frame_w: usize,
    ) -> Result<Array3<f32>> {
        let (rh, rw, _) = raw.dim();
        let (ph, pw, _) = input.image.dim();
        if rh * self.stride != ph || rw * self.stride != pw {
            return Err(PipelineError::malformed(
                name,
                format!(
                    "({}, {}, C) for a {}x{} input at stride {}",
                    ph / self.stride,
                    pw / self.stride,
                    ph,
                    pw,
                    self.stride
                ),
                raw.shape(),
            ));
        }

        let upsampled = resize_by(&to_mat(raw)?, self.stride as f64)?;
        let (keep_h, keep_w) = input.unpadded_dim();
        let cropped = crop_top_left(&upsampled, keep_h, keep_w)?;
        from_mat(&resize_to(&cropped, frame_h, frame_w)?)
    }
}
