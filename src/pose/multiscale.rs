use ndarray::{Array3, ArrayView3, Axis};
use tracing::debug;

use super::estimator::{PoseEstimator, HEATMAP_CHANNELS, VECTORFIELD_CHANNELS};
use super::scale::ScaleNormalizer;
use super::{ConfidenceField, VectorField};
use crate::config::Config;
use crate::error::{PipelineError, Result};

/// 全スケールの平均をとった出力マップ（いずれも元フレームと同じ H, W）
#[derive(Debug, Clone)]
pub struct AggregatedFields {
    /// (H, W, 19)
    pub heatmap: ConfidenceField,
    /// (H, W, 38)
    pub vectorfield: VectorField,
}

/// 複数スケールで推論し、出力マップを平均する
///
/// 推論器はここで一度だけ受け取り、フレームをまたいで使い回す。
pub struct MultiScaleAggregator<E> {
    estimator: E,
    scales: Vec<f32>,
    box_size: u32,
    normalizer: ScaleNormalizer,
}

impl<E: PoseEstimator> MultiScaleAggregator<E> {
    /// 倍率リストが空、または 0 以下の値を含む場合はエラー
    pub fn new(estimator: E, scales: Vec<f32>, box_size: u32, stride: u32, pad_value: u8) -> Result<Self> {
        if scales.is_empty() {
            return Err(PipelineError::invalid_scales("scale list is empty"));
        }
        if let Some(bad) = scales.iter().find(|s| !(**s > 0.0 && s.is_finite())) {
            return Err(PipelineError::invalid_scales(format!(
                "scale factors must be positive, got {}",
                bad
            )));
        }
        if stride == 0 {
            return Err(PipelineError::invalid_scales("stride must be positive"));
        }
        if box_size == 0 {
            return Err(PipelineError::invalid_scales("box size must be positive"));
        }

        Ok(Self {
            estimator,
            scales,
            box_size,
            normalizer: ScaleNormalizer::new(stride as usize, pad_value),
        })
    }

    pub fn from_config(estimator: E, config: &Config) -> Result<Self> {
        Self::new(
            estimator,
            config.search.scales.clone(),
            config.model.box_size,
            config.model.stride,
            config.model.pad_value,
        )
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// 実際の縮小倍率: scale * box_size / フレーム高さ
    pub fn multipliers(&self, frame_h: usize) -> Vec<f64> {
        self.scales
            .iter()
            .map(|&s| f64::from(s) * f64::from(self.box_size) / frame_h as f64)
            .collect()
    }

    /// フレーム (H, W, 3) を全スケールで推論し、平均マップを返す
    ///
    /// どれか1スケールでも推論に失敗したらフレーム全体を失敗とする（部分平均は返さない）。
    pub fn aggregate(&mut self, frame: ArrayView3<f32>) -> Result<AggregatedFields> {
        let (h, w, _) = frame.dim();
        if h == 0 || w == 0 {
            return Err(PipelineError::EmptyFrame);
        }

        let multipliers = self.multipliers(h);
        let weight = 1.0 / multipliers.len() as f32;

        let mut heatmap_avg = Array3::<f32>::zeros((h, w, HEATMAP_CHANNELS));
        let mut vectorfield_avg = Array3::<f32>::zeros((h, w, VECTORFIELD_CHANNELS));

        for &multiplier in &multipliers {
            let input = self.normalizer.prepare(frame, multiplier)?;
            let batch = input.image.view().insert_axis(Axis(0));

            let (heatmap, vectorfield) = self.estimator.predict(batch)?.into_maps()?;

            let heatmap = self.normalizer.restore("heatmap", heatmap.view(), &input, h, w)?;
            let vectorfield = self.normalizer.restore("vectorfield", vectorfield.view(), &input, h, w)?;

            heatmap_avg.scaled_add(weight, &heatmap);
            vectorfield_avg.scaled_add(weight, &vectorfield);

            debug!(
                multiplier,
                padded = ?input.image.dim(),
                pad_down = input.padding.down,
                pad_right = input.padding.right,
                "scale pass"
            );
        }

        Ok(AggregatedFields {
            heatmap: heatmap_avg,
            vectorfield: vectorfield_avg,
        })
    }
}
