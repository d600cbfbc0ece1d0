use ndarray::{ArrayView2, ArrayView3, Axis};
use tracing::debug;

use super::image::gaussian_blur;
use super::keypoint::{BodyPart, Keypoint, KeypointSet};
use crate::config::SearchConfig;
use crate::error::Result;

/// ピーク判定の絶対閾値（平滑化後の値に適用）
pub const DEFAULT_PEAK_THRESHOLD: f32 = 0.1;
/// 量子化ノイズ除去用ガウシアンの sigma
pub const DEFAULT_GAUSSIAN_SIGMA: f32 = 1.0;
/// カーネル半径 = truncate * sigma
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// 平均ヒートマップから部位ごとのキーポイント候補を取り出す
///
/// 平滑化はピーク位置の判定だけに使い、スコアには平滑化前の値を返す。
#[derive(Debug, Clone, Copy)]
pub struct PeakExtractor {
    threshold: f32,
    sigma: f32,
}

impl Default for PeakExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PEAK_THRESHOLD, DEFAULT_GAUSSIAN_SIGMA)
    }
}

impl PeakExtractor {
    pub fn new(threshold: f32, sigma: f32) -> Self {
        Self { threshold, sigma }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.peak_threshold, config.gaussian_sigma)
    }

    /// ヒートマップ (H, W, 19) の先頭18チャンネルからピークを抽出する
    ///
    /// ID は呼び出しごとに 0 から振り直し、部位順→ラスタ走査順に単調増加する。
    pub fn extract(&self, heatmap: ArrayView3<f32>) -> Result<KeypointSet> {
        let mut set = KeypointSet::new();
        let mut next_id = 0usize;

        let channels = heatmap.dim().2.min(BodyPart::COUNT);
        for (ch, part) in BodyPart::ALL.iter().copied().enumerate().take(channels) {
            let map_ori = heatmap.index_axis(Axis(2), ch);
            let peaks = self.channel_peaks(map_ori)?;
            debug!(part = part.name(), count = peaks.len(), "peaks");

            for (x, y) in peaks {
                set.push(part, Keypoint::new(x as i32, y as i32, map_ori[[y, x]], next_id));
                next_id += 1;
            }
        }

        Ok(set)
    }

    /// 1チャンネル分のピーク座標 (x, y)。ラスタ走査順（y 優先）
    ///
    /// 上下左右の4近傍以上かつ閾値超え。画像端は反対側と比較する（巡回）。
    pub fn channel_peaks(&self, map: ArrayView2<f32>) -> Result<Vec<(usize, usize)>> {
        if map.is_empty() {
            return Ok(Vec::new());
        }
        let smoothed = if self.sigma > 0.0 {
            gaussian_blur(map, f64::from(self.sigma), GAUSSIAN_TRUNCATE)?
        } else {
            map.to_owned()
        };
        let (h, w) = smoothed.dim();
        let mut peaks = Vec::new();

        for y in 0..h {
            let up = (y + h - 1) % h;
            let down = (y + 1) % h;
            for x in 0..w {
                let v = smoothed[[y, x]];
                if v <= self.threshold {
                    continue;
                }
                let left = (x + w - 1) % w;
                let right = (x + 1) % w;
                if v >= smoothed[[up, x]]
                    && v >= smoothed[[down, x]]
                    && v >= smoothed[[y, left]]
                    && v >= smoothed[[y, right]]
                {
                    peaks.push((x, y));
                }
            }
        }

        Ok(peaks)
    }
}
