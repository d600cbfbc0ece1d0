/// COCO 18 キーポイントのチャンネル順（ヒートマップ ch0〜17、ch18 は背景）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    Neck = 1,
    RightShoulder = 2,
    RightElbow = 3,
    RightWrist = 4,
    LeftShoulder = 5,
    LeftElbow = 6,
    LeftWrist = 7,
    RightHip = 8,
    RightKnee = 9,
    RightAnkle = 10,
    LeftHip = 11,
    LeftKnee = 12,
    LeftAnkle = 13,
    RightEye = 14,
    LeftEye = 15,
    RightEar = 16,
    LeftEar = 17,
}

impl BodyPart {
    /// 部位チャンネル数（背景を除く）
    pub const COUNT: usize = 18;

    pub const ALL: [BodyPart; Self::COUNT] = [
        Self::Nose,
        Self::Neck,
        Self::RightShoulder,
        Self::RightElbow,
        Self::RightWrist,
        Self::LeftShoulder,
        Self::LeftElbow,
        Self::LeftWrist,
        Self::RightHip,
        Self::RightKnee,
        Self::RightAnkle,
        Self::LeftHip,
        Self::LeftKnee,
        Self::LeftAnkle,
        Self::RightEye,
        Self::LeftEye,
        Self::RightEar,
        Self::LeftEar,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::Neck => "neck",
            Self::RightShoulder => "Rsho",
            Self::RightElbow => "Relb",
            Self::RightWrist => "Rwri",
            Self::LeftShoulder => "Lsho",
            Self::LeftElbow => "Lelb",
            Self::LeftWrist => "Lwri",
            Self::RightHip => "Rhip",
            Self::RightKnee => "Rkne",
            Self::RightAnkle => "Rank",
            Self::LeftHip => "Lhip",
            Self::LeftKnee => "Lkne",
            Self::LeftAnkle => "Lank",
            Self::RightEye => "Reye",
            Self::LeftEye => "Leye",
            Self::RightEar => "Rear",
            Self::LeftEar => "Lear",
        }
    }
}

/// ピーク検出で得た単一キーポイント（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: i32,
    pub y: i32,
    /// 平滑化前の信頼度
    pub score: f32,
    /// フレーム内で一意な通し番号（部位順→走査順）
    pub id: usize,
}

impl Keypoint {
    pub fn new(x: i32, y: i32, score: f32, id: usize) -> Self {
        Self { x, y, score, id }
    }
}

/// 部位ごとのキーポイント候補列
///
/// 1部位に0個・1個・複数個の候補があり得る。フレームごとに作り直す。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointSet {
    parts: [Vec<Keypoint>; BodyPart::COUNT],
}

impl KeypointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: BodyPart, keypoint: Keypoint) {
        self.parts[part as usize].push(keypoint);
    }

    pub fn candidates(&self, part: BodyPart) -> &[Keypoint] {
        &self.parts[part as usize]
    }

    /// 部位の代表点。抽出順で最初の候補を使う（スコアは見ない）
    pub fn first(&self, part: BodyPart) -> Option<&Keypoint> {
        self.parts[part as usize].first()
    }

    /// 代表点の (x, y)
    pub fn point(&self, part: BodyPart) -> Option<(i32, i32)> {
        self.first(part).map(|kp| (kp.x, kp.y))
    }

    pub fn total(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// 全キーポイントを部位順に列挙
    pub fn iter(&self) -> impl Iterator<Item = (BodyPart, &Keypoint)> {
        BodyPart::ALL
            .iter()
            .flat_map(move |&part| self.candidates(part).iter().map(move |kp| (part, kp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_part_count() {
        assert_eq!(BodyPart::COUNT, 18);
        assert_eq!(BodyPart::ALL.len(), BodyPart::COUNT);
    }

    #[test]
    fn test_body_part_from_index() {
        assert_eq!(BodyPart::from_index(0), Some(BodyPart::Nose));
        assert_eq!(BodyPart::from_index(2), Some(BodyPart::RightShoulder));
        assert_eq!(BodyPart::from_index(17), Some(BodyPart::LeftEar));
        assert_eq!(BodyPart::from_index(18), None);
    }

    #[test]
    fn test_body_part_discriminants_match_channels() {
        for (i, part) in BodyPart::ALL.iter().enumerate() {
            assert_eq!(*part as usize, i);
        }
    }

    #[test]
    fn test_first_ignores_score() {
        let mut set = KeypointSet::new();
        set.push(BodyPart::Neck, Keypoint::new(10, 20, 0.2, 0));
        set.push(BodyPart::Neck, Keypoint::new(30, 40, 0.9, 1));

        let first = set.first(BodyPart::Neck).unwrap();
        assert_eq!((first.x, first.y), (10, 20));
        assert_eq!(set.point(BodyPart::Neck), Some((10, 20)));
        assert_eq!(set.candidates(BodyPart::Neck).len(), 2);
    }

    #[test]
    fn test_missing_part() {
        let set = KeypointSet::new();
        assert!(set.first(BodyPart::Nose).is_none());
        assert!(set.point(BodyPart::Nose).is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter_in_part_order() {
        let mut set = KeypointSet::new();
        set.push(BodyPart::RightHip, Keypoint::new(1, 1, 0.5, 1));
        set.push(BodyPart::Nose, Keypoint::new(0, 0, 0.5, 0));

        let parts: Vec<BodyPart> = set.iter().map(|(p, _)| p).collect();
        assert_eq!(parts, vec![BodyPart::Nose, BodyPart::RightHip]);
        assert_eq!(set.total(), 2);
    }
}
