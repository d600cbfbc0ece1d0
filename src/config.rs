use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// 推論モデルの入力規約
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
    /// 学習時の入力ボックスサイズ（フレーム高さをこの値に合わせて倍率を決める）
    #[serde(default = "default_box_size")]
    pub box_size: u32,
    /// 出力マップのストライド。入力はこの倍数にパディングする
    #[serde(default = "default_stride")]
    pub stride: u32,
    /// パディング値
    #[serde(default = "default_pad_value")]
    pub pad_value: u8,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// PAF (38ch) の出力名
    #[serde(default = "default_vectorfield_output")]
    pub vectorfield_output: String,
    /// ヒートマップ (19ch) の出力名
    #[serde(default = "default_heatmap_output")]
    pub heatmap_output: String,
}

fn default_model_path() -> String { "models/openpose_coco.onnx".to_string() }
fn default_box_size() -> u32 { 368 }
fn default_stride() -> u32 { 8 }
fn default_pad_value() -> u8 { 128 }
fn default_input_name() -> String { "input_1".to_string() }
fn default_vectorfield_output() -> String { "Mconv7_stage6_L1".to_string() }
fn default_heatmap_output() -> String { "Mconv7_stage6_L2".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            box_size: default_box_size(),
            stride: default_stride(),
            pad_value: default_pad_value(),
            input_name: default_input_name(),
            vectorfield_output: default_vectorfield_output(),
            heatmap_output: default_heatmap_output(),
        }
    }
}

/// マルチスケール探索とピーク抽出のパラメータ
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// 探索倍率。`[0.5, 1.0]` でも `"0.5, 1"` でも書ける
    #[serde(default = "default_scales", deserialize_with = "deserialize_scales")]
    pub scales: Vec<f32>,
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f32,
    #[serde(default = "default_gaussian_sigma")]
    pub gaussian_sigma: f32,
}

fn default_scales() -> Vec<f32> { vec![0.5, 1.0, 1.5, 2.0] }
fn default_peak_threshold() -> f32 { 0.1 }
fn default_gaussian_sigma() -> f32 { 1.0 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scales: default_scales(),
            peak_threshold: default_peak_threshold(),
            gaussian_sigma: default_gaussian_sigma(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// 1回の解析で読むフレーム数の上限
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

fn default_max_frames() -> usize { 10 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_frames: default_max_frames(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalesRepr {
    List(Vec<f32>),
    Text(String),
}

fn deserialize_scales<'de, D>(deserializer: D) -> std::result::Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    match ScalesRepr::deserialize(deserializer)? {
        ScalesRepr::List(scales) => Ok(scales),
        ScalesRepr::Text(text) => parse_scale_list(&text).map_err(serde::de::Error::custom),
    }
}

/// `"0.5, 1, 1.5, 2  # comment"` 形式の倍率リストを解釈する
pub fn parse_scale_list(text: &str) -> Result<Vec<f32>> {
    let body = text.split('#').next().unwrap_or_default();
    body.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .with_context(|| format!("invalid scale value `{}`", s))
        })
        .collect()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// ファイルが無ければデフォルト値で続行する。読めるが壊れている設定はエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.scales.is_empty() {
            bail!("search.scales must not be empty");
        }
        if let Some(bad) = self.search.scales.iter().find(|s| !(**s > 0.0) || !s.is_finite()) {
            bail!("search.scales must be positive, got {}", bad);
        }
        if self.model.stride == 0 {
            bail!("model.stride must be positive");
        }
        if self.model.box_size == 0 {
            bail!("model.box_size must be positive");
        }
        if self.session.max_frames == 0 {
            bail!("session.max_frames must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model.box_size, 368);
        assert_eq!(config.model.stride, 8);
        assert_eq!(config.model.pad_value, 128);
        assert_eq!(config.search.scales, vec![0.5, 1.0, 1.5, 2.0]);
        assert_eq!(config.search.peak_threshold, 0.1);
        assert_eq!(config.search.gaussian_sigma, 1.0);
        assert_eq!(config.session.max_frames, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [model]
            stride = 4

            [search]
            scales = [1.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.model.stride, 4);
        assert_eq!(config.model.box_size, 368);
        assert_eq!(config.search.scales, vec![1.0]);
        assert_eq!(config.session.max_frames, 10);
    }

    #[test]
    fn test_scales_as_text() {
        let config: Config = toml::from_str(
            r#"
            [search]
            scales = "0.5, 1, 1.5, 2  # 探索倍率"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.scales, vec![0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_parse_scale_list_rejects_garbage() {
        assert!(parse_scale_list("0.5, abc").is_err());
        assert_eq!(parse_scale_list(" 1 ,, 2,").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_validate_rejects_bad_scales() {
        let mut config = Config::default();
        config.search.scales.clear();
        assert!(config.validate().is_err());

        config.search.scales = vec![1.0, 0.0];
        assert!(config.validate().is_err());

        config.search.scales = vec![1.0, -0.5];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_stride() {
        let mut config = Config::default();
        config.model.stride = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nmax_frames = 3").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.session.max_frames, 3);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.session.max_frames, 10);
    }

    #[test]
    fn test_load_or_default_rejects_broken_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nscales = \"0.5, abc\"\n\n[session]\nmax_frames = 3").unwrap();
        let err = Config::load_or_default(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid scale value `abc`"));
    }

    #[test]
    fn test_load_or_default_reads_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nscales = \"1, 2\"\n\n[session]\nmax_frames = 3").unwrap();
        let config = Config::load_or_default(file.path()).unwrap();
        assert_eq!(config.search.scales, vec![1.0, 2.0]);
        assert_eq!(config.session.max_frames, 3);
    }
}
