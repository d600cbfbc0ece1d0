//! スクワット判定
//!
//! 右半身（右肩・右腰・右膝・右足首）と首を使う。画像座標なので y は下向きに増える。
//! 腰の深さと膝の位置はキーポイントが欠けていたら違反として扱い、
//! 背中の角度は欠けていたら判定しない。

use crate::pose::{BodyPart, KeypointSet};

/// 腰が肩よりこれを超えて下にあること（ピクセル）
pub const HIP_DROP_MIN: i32 = 30;
/// 首→腰ベクトルの角度の許容範囲（度）
pub const BACK_ANGLE_MIN: f64 = 70.0;
pub const BACK_ANGLE_MAX: f64 = 180.0;
/// 膝が足首より前に出てよい量（ピクセル）
pub const KNEE_FORWARD_MAX: i32 = 40;

/// 首→腰ベクトルの角度の絶対値（度、0〜180）
pub fn back_angle(neck: (i32, i32), hip: (i32, i32)) -> f64 {
    let dy = f64::from(hip.1 - neck.1);
    let dx = f64::from(hip.0 - neck.0);
    dy.atan2(dx).to_degrees().abs()
}

pub fn violations(keypoints: &KeypointSet) -> Vec<String> {
    let neck = keypoints.point(BodyPart::Neck);
    let shoulder = keypoints.point(BodyPart::RightShoulder);
    let hip = keypoints.point(BodyPart::RightHip);
    let knee = keypoints.point(BodyPart::RightKnee);
    let ankle = keypoints.point(BodyPart::RightAnkle);

    let mut bad = Vec::new();

    match (hip, shoulder) {
        (Some(hip), Some(shoulder)) if hip.1 > shoulder.1 + HIP_DROP_MIN => {}
        _ => bad.push("Hip not low enough".to_string()),
    }

    if let (Some(neck), Some(hip)) = (neck, hip) {
        let angle = back_angle(neck, hip);
        if !(BACK_ANGLE_MIN..=BACK_ANGLE_MAX).contains(&angle) {
            bad.push(format!("Back angle abnormal ({}°)", angle.round_ties_even()));
        }
    }

    match (knee, ankle) {
        (Some(knee), Some(ankle)) if knee.0 <= ankle.0 + KNEE_FORWARD_MAX => {}
        _ => bad.push("Knee goes too far forward".to_string()),
    }

    bad
}
