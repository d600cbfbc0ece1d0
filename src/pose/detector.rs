use anyhow::{Context, Result};
use ndarray::{ArrayView4, Ix4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::info;

use super::estimator::{EstimatorOutput, PoseEstimator};
use crate::config::ModelConfig;
use crate::error::PipelineError;

/// OpenPose (COCO 18点) ONNX モデルによる推論器
///
/// 入力: (1, H, W, 3) の f32 テンソル（H, W は stride の倍数）
/// 出力: PAF (1, H/stride, W/stride, 38) とヒートマップ (1, H/stride, W/stride, 19)
pub struct OnnxPoseEstimator {
    session: Session,
    input_name: String,
    vectorfield_output: String,
    heatmap_output: String,
}

fn build_session(model_path: &Path) -> Result<Session> {
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "cuda")]
    let builder = {
        info!("[ort] Attempting CUDA execution provider...");
        builder.with_execution_providers([
            ort::execution_providers::CUDAExecutionProvider::default().build()
        ])?
    };

    builder
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))
}

impl OnnxPoseEstimator {
    /// モデルを一度だけ読み込む。以降のフレームでは同じセッションを使い回す
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        let session = build_session(path)?;
        info!("model loaded: {}", path.display());

        Ok(Self {
            session,
            input_name: config.input_name.clone(),
            vectorfield_output: config.vectorfield_output.clone(),
            heatmap_output: config.heatmap_output.clone(),
        })
    }
}

impl PoseEstimator for OnnxPoseEstimator {
    fn predict(&mut self, input: ArrayView4<f32>) -> crate::error::Result<EstimatorOutput> {
        let input_tensor = Tensor::from_array(input.to_owned())
            .map_err(|e| PipelineError::estimator(format!("input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PipelineError::estimator(format!("inference failed: {e}")))?;

        let vectorfield = outputs[self.vectorfield_output.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| PipelineError::estimator(format!("{}: {e}", self.vectorfield_output)))?;
        let shape = vectorfield.shape().to_vec();
        let vectorfield = vectorfield
            .into_dimensionality::<Ix4>()
            .map_err(|_| PipelineError::malformed("vectorfield", "rank 4", &shape))?
            .to_owned();

        let heatmap = outputs[self.heatmap_output.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| PipelineError::estimator(format!("{}: {e}", self.heatmap_output)))?;
        let shape = heatmap.shape().to_vec();
        let heatmap = heatmap
            .into_dimensionality::<Ix4>()
            .map_err(|_| PipelineError::malformed("heatmap", "rank 4", &shape))?
            .to_owned();

        Ok(EstimatorOutput::new(vectorfield, heatmap))
    }
}
