use ndarray::{Array3, Array4, ArrayView4, Axis};

use crate::error::{PipelineError, Result};

/// ヒートマップのチャンネル数（18部位 + 背景）
pub const HEATMAP_CHANNELS: usize = 19;
/// PAF のチャンネル数（19リンク × (x, y)）
pub const VECTORFIELD_CHANNELS: usize = 38;

/// 推論器の生出力。いずれも先頭にバッチ次元 1 を持つ NHWC
#[derive(Debug, Clone)]
pub struct EstimatorOutput {
    /// (1, h, w, 38)
    pub vectorfield: Array4<f32>,
    /// (1, h, w, 19)
    pub heatmap: Array4<f32>,
}

impl EstimatorOutput {
    pub fn new(vectorfield: Array4<f32>, heatmap: Array4<f32>) -> Self {
        Self {
            vectorfield,
            heatmap,
        }
    }

    /// バッチ次元を外して (heatmap, vectorfield) を返す。形状が合わなければエラー
    pub fn into_maps(self) -> Result<(Array3<f32>, Array3<f32>)> {
        let heatmap = squeeze_batch("heatmap", self.heatmap, HEATMAP_CHANNELS)?;
        let vectorfield = squeeze_batch("vectorfield", self.vectorfield, VECTORFIELD_CHANNELS)?;
        if heatmap.dim().0 != vectorfield.dim().0 || heatmap.dim().1 != vectorfield.dim().1 {
            return Err(PipelineError::malformed(
                "vectorfield",
                format!("spatial size matching heatmap {:?}", &heatmap.shape()[..2]),
                vectorfield.shape(),
            ));
        }
        Ok((heatmap, vectorfield))
    }
}

fn squeeze_batch(name: &'static str, array: Array4<f32>, channels: usize) -> Result<Array3<f32>> {
    let shape = array.shape().to_vec();
    if shape[0] != 1 || shape[3] != channels || shape[1] == 0 || shape[2] == 0 {
        return Err(PipelineError::malformed(
            name,
            format!("(1, h, w, {})", channels),
            &shape,
        ));
    }
    Ok(array.index_axis_move(Axis(0), 0))
}

/// 姿勢推定モデル
///
/// 入力はパディング済み画像 1 枚 (1, H, W, 3)。ロード済みの重みを持つ単一インスタンスとして扱い、
/// 同時に複数フレームから呼ばない前提で `&mut self` を取る。
pub trait PoseEstimator {
    fn predict(&mut self, input: ArrayView4<f32>) -> Result<EstimatorOutput>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn predict(&mut self, input: ArrayView4<f32>) -> Result<EstimatorOutput> {
        (**self).predict(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_maps_squeezes_batch() {
        let out = EstimatorOutput::new(
            Array4::zeros((1, 3, 4, VECTORFIELD_CHANNELS)),
            Array4::zeros((1, 3, 4, HEATMAP_CHANNELS)),
        );
        let (heatmap, paf) = out.into_maps().unwrap();
        assert_eq!(heatmap.dim(), (3, 4, HEATMAP_CHANNELS));
        assert_eq!(paf.dim(), (3, 4, VECTORFIELD_CHANNELS));
    }

    #[test]
    fn test_into_maps_rejects_wrong_channels() {
        let out = EstimatorOutput::new(
            Array4::zeros((1, 3, 4, VECTORFIELD_CHANNELS)),
            Array4::zeros((1, 3, 4, 17)),
        );
        let err = out.into_maps().unwrap_err();
        assert!(err.to_string().contains("heatmap"));
    }

    #[test]
    fn test_into_maps_rejects_batch_of_two() {
        let out = EstimatorOutput::new(
            Array4::zeros((2, 3, 4, VECTORFIELD_CHANNELS)),
            Array4::zeros((2, 3, 4, HEATMAP_CHANNELS)),
        );
        assert!(out.into_maps().is_err());
    }

    #[test]
    fn test_into_maps_rejects_mismatched_spatial_size() {
        let out = EstimatorOutput::new(
            Array4::zeros((1, 2, 4, VECTORFIELD_CHANNELS)),
            Array4::zeros((1, 3, 4, HEATMAP_CHANNELS)),
        );
        assert!(out.into_maps().is_err());
    }
}
