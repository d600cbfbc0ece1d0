//! キーポイントから姿勢フィードバックを作るルールベース評価器
//!
//! 各ルールは 0 または 1 個の診断文を出す。1つでも該当すれば
//! `❌ Bad <姿勢> posture: 診断1, 診断2` を、該当なしなら `✅ Good <姿勢> posture` を返す。

pub mod desk;
pub mod squat;

use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::pose::KeypointSet;

/// 評価対象の姿勢
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostureType {
    Squat,
    Desk,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized posture type `{0}`")]
pub struct UnknownPosture(pub String);

impl FromStr for PostureType {
    type Err = UnknownPosture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("squat") {
            Ok(Self::Squat)
        } else if s.eq_ignore_ascii_case("desk") {
            Ok(Self::Desk)
        } else {
            Err(UnknownPosture(s.to_string()))
        }
    }
}

impl PostureType {
    /// フィードバック文中の呼び名
    fn label(self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Desk => "sitting",
        }
    }

    /// 該当したルールの診断文（評価順）
    pub fn violations(self, keypoints: &KeypointSet) -> Vec<String> {
        match self {
            Self::Squat => squat::violations(keypoints),
            Self::Desk => desk::violations(keypoints),
        }
    }

    /// 診断文をまとめた1行のフィードバック
    pub fn feedback(self, keypoints: &KeypointSet) -> String {
        let violations = self.violations(keypoints);
        if violations.is_empty() {
            format!("✅ Good {} posture", self.label())
        } else {
            format!("❌ Bad {} posture: {}", self.label(), violations.join(", "))
        }
    }
}

/// 姿勢名を解釈して評価する。未知の姿勢名は空リスト（エラーにしない）
///
/// 現状は常に 0 か 1 要素を返す。
pub fn evaluate(keypoints: &KeypointSet, posture_type: &str) -> Vec<String> {
    match posture_type.parse::<PostureType>() {
        Ok(posture) => vec![posture.feedback(keypoints)],
        Err(e) => {
            debug!("{}", e);
            Vec::new()
        }
    }
}
