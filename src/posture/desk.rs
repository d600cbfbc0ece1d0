//! デスクでの座り姿勢判定
//!
//! 必要なキーポイントが欠けているルールは判定しない（違反扱いにもしない）。

use crate::pose::{BodyPart, KeypointSet};

/// 鼻と首の水平ずれの上限（ピクセル）
pub const HEAD_FORWARD_MAX: i32 = 35;
/// 鼻の y がこれ未満なら頭が高すぎる
pub const NOSE_MIN_Y: i32 = 180;
/// 首が両肩の平均より上に出てよい量（ピクセル）
pub const NECK_RISE_MAX: f64 = 20.0;
/// 肩幅の上限（ピクセル）
pub const SHOULDER_WIDTH_MAX: i32 = 250;
/// 首→腰の水平ずれ / 垂直ずれ の上限
pub const BACK_LEAN_RATIO: f64 = 0.4;

pub fn violations(keypoints: &KeypointSet) -> Vec<String> {
    let nose = keypoints.point(BodyPart::Nose);
    let neck = keypoints.point(BodyPart::Neck);
    let r_shoulder = keypoints.point(BodyPart::RightShoulder);
    let l_shoulder = keypoints.point(BodyPart::LeftShoulder);
    let hip = keypoints.point(BodyPart::RightHip);

    let mut bad = Vec::new();

    if let (Some(nose), Some(neck)) = (nose, neck) {
        if (nose.0 - neck.0).abs() > HEAD_FORWARD_MAX {
            bad.push("Slouching: head too forward".to_string());
        }
    }

    if let Some(nose) = nose {
        if nose.1 < NOSE_MIN_Y {
            bad.push("Head too high - might be hair forward".to_string());
        }
    }

    if let (Some(neck), Some(r), Some(l)) = (neck, r_shoulder, l_shoulder) {
        let avg_shoulder_y = f64::from(r.1 + l.1) / 2.0;
        if f64::from(neck.1) < avg_shoulder_y - NECK_RISE_MAX {
            bad.push("Neck above shoulders - slouching".to_string());
        }

        if (r.0 - l.0).abs() > SHOULDER_WIDTH_MAX {
            bad.push("Shoulders too wide – forward leaning".to_string());
        }
    }

    if let (Some(neck), Some(hip)) = (neck, hip) {
        let horiz = f64::from((neck.0 - hip.0).abs());
        let vert = f64::from((neck.1 - hip.1).abs());
        if horiz > vert * BACK_LEAN_RATIO {
            bad.push("Back not vertically aligned".to_string());
        }
    }

    bad
}
