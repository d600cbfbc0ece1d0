//! 1回の解析リクエスト分のフレームを順に処理し、フィードバックを集計する

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::pose::{Frame, MultiScaleAggregator, PeakExtractor, PoseEstimator};
use crate::posture;

/// 1フレーム分の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameFeedback {
    /// 1始まりのフレーム番号
    pub frame: usize,
    pub feedback: Vec<String>,
}

/// 解析結果。JSON では `{ "summary": [...], "analysis": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// 全フレームで出た相異なるフィードバック
    pub summary: BTreeSet<String>,
    pub analysis: Vec<FrameFeedback>,
    /// 読み込んだフレーム数（推論に失敗したフレームを含む）
    #[serde(skip)]
    pub frames_read: usize,
    /// 推論に失敗してスキップしたフレーム数
    #[serde(skip)]
    pub frames_failed: usize,
}

impl AnalysisReport {
    fn record(&mut self, frame: usize, primary: String) {
        self.summary.insert(primary.clone());
        self.analysis.push(FrameFeedback {
            frame,
            feedback: vec![primary],
        });
    }
}

/// マルチスケール推論 → ピーク抽出 → ルール評価 をフレームごとに直列に回す
///
/// 推論器は再入可能とは限らないので、フレームは必ず1枚ずつ処理する。
pub struct SessionAggregator<E> {
    aggregator: MultiScaleAggregator<E>,
    extractor: PeakExtractor,
    max_frames: usize,
}

impl<E: PoseEstimator> SessionAggregator<E> {
    pub fn new(aggregator: MultiScaleAggregator<E>, extractor: PeakExtractor, max_frames: usize) -> Self {
        Self {
            aggregator,
            extractor,
            max_frames,
        }
    }

    /// スケール設定が不正なら、フレームを読む前にここで失敗する
    pub fn from_config(estimator: E, config: &Config) -> Result<Self> {
        let aggregator = MultiScaleAggregator::from_config(estimator, config)?;
        Ok(Self::new(
            aggregator,
            PeakExtractor::from_config(&config.search),
            config.session.max_frames,
        ))
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn aggregator(&self) -> &MultiScaleAggregator<E> {
        &self.aggregator
    }

    /// 1フレーム分のフィードバック一覧
    pub fn process_frame(&mut self, frame: &Frame, posture_type: &str) -> Result<Vec<String>> {
        let fields = self.aggregator.aggregate(frame.view())?;
        let keypoints = self.extractor.extract(fields.heatmap.view())?;
        Ok(posture::evaluate(&keypoints, posture_type))
    }

    /// 最大 `max_frames` 枚まで処理する
    ///
    /// 各フレームは先頭のフィードバック1件だけを採用する。推論に失敗したフレームは
    /// 警告を出して飛ばし、残りのフレームは続行する。設定エラーはセッションごと中断する。
    pub fn analyze<I>(&mut self, frames: I, posture_type: &str) -> Result<AnalysisReport>
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut report = AnalysisReport::default();

        for (i, frame) in frames.into_iter().take(self.max_frames).enumerate() {
            let index = i + 1;
            report.frames_read += 1;

            match self.process_frame(&frame, posture_type) {
                Ok(feedback) => match feedback.into_iter().next() {
                    Some(primary) => {
                        info!(frame = index, "{}", primary);
                        report.record(index, primary);
                    }
                    None => info!(frame = index, "no feedback"),
                },
                Err(e) if e.is_per_frame() => {
                    warn!(frame = index, "skipping frame: {}", e);
                    report.frames_failed += 1;
                }
                Err(e) => {
                    error!(frame = index, "aborting session: {}", e);
                    return Err(e);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pose::estimator::stub::StubEstimator;
    use ndarray::Array3;

    fn session(stub: StubEstimator, max_frames: usize) -> SessionAggregator<StubEstimator> {
        let aggregator = MultiScaleAggregator::new(stub, vec![1.0], 16, 8, 128).unwrap();
        SessionAggregator::new(aggregator, PeakExtractor::default(), max_frames)
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|_| Array3::from_elem((16, 16, 3), 100.0)).collect()
    }

    #[test]
    fn test_cap_stops_consumption() {
        let mut s = session(StubEstimator::new(8), 10);
        let report = s.analyze(frames(15), "desk").unwrap();
        assert_eq!(report.frames_read, 10);
        assert_eq!(report.analysis.len(), 10);
        assert_eq!(s.aggregator().estimator().calls, 10);
    }

    #[test]
    fn test_short_source_ends_without_error() {
        let mut s = session(StubEstimator::new(8), 10);
        let report = s.analyze(frames(3), "desk").unwrap();
        assert_eq!(report.frames_read, 3);
        let indices: Vec<usize> = report.analysis.iter().map(|f| f.frame).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_summary_deduplicates() {
        let mut s = session(StubEstimator::new(8), 10);
        let report = s.analyze(frames(5), "desk").unwrap();
        assert_eq!(report.analysis.len(), 5);
        assert_eq!(report.summary.len(), 1);
        assert!(report.summary.contains("✅ Good sitting posture"));
    }

    #[test]
    fn test_one_feedback_per_frame() {
        let mut s = session(StubEstimator::new(8), 10);
        let report = s.analyze(frames(2), "squat").unwrap();
        for entry in &report.analysis {
            assert_eq!(entry.feedback.len(), 1);
        }
        assert_eq!(
            report.analysis[0].feedback[0],
            "❌ Bad squat posture: Hip not low enough, Knee goes too far forward"
        );
    }

    #[test]
    fn test_unknown_posture_contributes_nothing() {
        let mut s = session(StubEstimator::new(8), 10);
        let report = s.analyze(frames(4), "yoga").unwrap();
        assert_eq!(report.frames_read, 4);
        assert!(report.analysis.is_empty());
        assert!(report.summary.is_empty());
    }

    #[test]
    fn test_estimator_failure_skips_only_that_frame() {
        let mut stub = StubEstimator::new(8);
        stub.fail_on_call = Some(1);
        let mut s = session(stub, 10);

        let report = s.analyze(frames(3), "desk").unwrap();
        assert_eq!(report.frames_read, 3);
        assert_eq!(report.frames_failed, 1);
        let indices: Vec<usize> = report.analysis.iter().map(|f| f.frame).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_configuration_error_aborts_session() {
        let mut stub = StubEstimator::new(8);
        stub.fail_on_call = Some(1);
        stub.config_failure = true;
        let mut s = session(stub, 10);

        let err = s.analyze(frames(5), "desk").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidScaleConfiguration(_)));
        // 3枚目以降は読まない
        assert_eq!(s.aggregator().estimator().calls, 2);
    }

    #[test]
    fn test_from_config_rejects_empty_scales() {
        let mut config = Config::default();
        config.search.scales.clear();
        assert!(SessionAggregator::from_config(StubEstimator::new(8), &config).is_err());
    }

    #[test]
    fn test_from_config_takes_frame_cap() {
        let mut config = Config::default();
        config.session.max_frames = 4;
        let s = SessionAggregator::from_config(StubEstimator::new(8), &config).unwrap();
        assert_eq!(s.max_frames(), 4);
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = AnalysisReport::default();
        report.record(1, "✅ Good squat posture".to_string());
        report.record(2, "✅ Good squat posture".to_string());
        report.frames_read = 2;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"], serde_json::json!(["✅ Good squat posture"]));
        assert_eq!(json["analysis"][1]["frame"], 2);
        assert_eq!(json["analysis"][1]["feedback"][0], "✅ Good squat posture");
        assert!(json.get("frames_read").is_none());
    }
}
