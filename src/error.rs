//! パイプラインのエラー型

use thiserror::Error;

/// 姿勢解析パイプラインで発生するエラー
#[derive(Debug, Error)]
pub enum PipelineError {
    /// スケール設定が不正（空リスト、0以下の値、stride/box_size が 0 など）
    #[error("invalid scale configuration: {0}")]
    InvalidScaleConfiguration(String),

    /// 縮小後の画像面積が 0 になるスケール
    #[error("scale {scale} yields an empty image for a {height}x{width} frame")]
    InvalidScale {
        /// 実際に適用した倍率
        scale: f32,
        /// 元フレームの高さ
        height: usize,
        /// 元フレームの幅
        width: usize,
    },

    /// 推論器の実行失敗
    #[error("pose estimator failure: {0}")]
    EstimatorFailure(String),

    /// 推論器出力の形状不一致
    #[error("malformed estimator output `{name}`: expected {expected}, got {actual:?}")]
    MalformedOutput {
        /// 出力名 (heatmap / vectorfield)
        name: &'static str,
        /// 期待する形状の説明
        expected: String,
        /// 実際の形状
        actual: Vec<usize>,
    },

    /// 高さまたは幅が 0 のフレーム
    #[error("empty frame")]
    EmptyFrame,

    /// リサイズ・平滑化などの画像処理の失敗
    #[error("image processing failed: {0}")]
    Image(String),
}

#[cfg(feature = "desktop")]
impl From<opencv::Error> for PipelineError {
    fn from(e: opencv::Error) -> Self {
        Self::Image(e.to_string())
    }
}

impl PipelineError {
    #[must_use]
    pub fn invalid_scales(reason: impl Into<String>) -> Self {
        Self::InvalidScaleConfiguration(reason.into())
    }

    #[must_use]
    pub fn estimator(reason: impl Into<String>) -> Self {
        Self::EstimatorFailure(reason.into())
    }

    #[must_use]
    pub fn malformed(name: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self::MalformedOutput {
            name,
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }

    /// フレーム単位でスキップ可能なエラーか（設定エラーはセッション全体を止める）
    pub fn is_per_frame(&self) -> bool {
        !matches!(self, Self::InvalidScaleConfiguration(_))
    }
}

/// パイプライン処理の Result 型
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_scales_message() {
        let err = PipelineError::invalid_scales("scale list is empty");
        assert!(err.to_string().contains("invalid scale configuration"));
        assert!(err.to_string().contains("empty"));
        assert!(!err.is_per_frame());
    }

    #[test]
    fn test_invalid_scale_message() {
        let err = PipelineError::InvalidScale {
            scale: 0.001,
            height: 100,
            width: 50,
        };
        assert!(err.to_string().contains("100x50"));
        assert!(err.is_per_frame());
    }

    #[test]
    fn test_malformed_output_message() {
        let err = PipelineError::malformed("heatmap", "(1, h, w, 19)", &[1, 4, 4, 3]);
        let msg = err.to_string();
        assert!(msg.contains("heatmap"));
        assert!(msg.contains("[1, 4, 4, 3]"));
        assert!(err.is_per_frame());
    }

    #[test]
    fn test_estimator_failure_is_per_frame() {
        assert!(PipelineError::estimator("session closed").is_per_frame());
        assert!(PipelineError::EmptyFrame.is_per_frame());
        assert!(PipelineError::Image("resize".into()).is_per_frame());
    }
}
