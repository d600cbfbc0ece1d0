#[cfg(feature = "onnx")]
pub mod detector;
pub mod estimator;
#[cfg(feature = "desktop")]
pub mod image;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod multiscale;
#[cfg(feature = "desktop")]
pub mod peaks;
#[cfg(feature = "desktop")]
pub mod scale;

use ndarray::Array3;

/// デコード済みフレーム (H, W, 3)。BGR、値域 0〜255
pub type Frame = Array3<f32>;
/// 部位ごとの信頼度マップ (H, W, 19)
pub type ConfidenceField = Array3<f32>;
/// リンク方向ベクトル場 (H, W, 38)
pub type VectorField = Array3<f32>;

#[cfg(feature = "onnx")]
pub use detector::OnnxPoseEstimator;
pub use estimator::{EstimatorOutput, PoseEstimator, HEATMAP_CHANNELS, VECTORFIELD_CHANNELS};
pub use keypoint::{BodyPart, Keypoint, KeypointSet};
#[cfg(feature = "desktop")]
pub use multiscale::{AggregatedFields, MultiScaleAggregator};
#[cfg(feature = "desktop")]
pub use peaks::PeakExtractor;
#[cfg(feature = "desktop")]
pub use scale::{Padding, ScaleNormalizer};
