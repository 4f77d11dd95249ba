use std::collections::HashMap;

use nalgebra::Vector3;
use serde::Deserialize;

/// ポーズエンジンが出力する 17 キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// エンジン側の名前 (`hipL` など)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "eyeL",
            Self::RightEye => "eyeR",
            Self::LeftEar => "earL",
            Self::RightEar => "earR",
            Self::LeftShoulder => "shoulderL",
            Self::RightShoulder => "shoulderR",
            Self::LeftElbow => "elbowL",
            Self::RightElbow => "elbowR",
            Self::LeftWrist => "wristL",
            Self::RightWrist => "wristR",
            Self::LeftHip => "hipL",
            Self::RightHip => "hipR",
            Self::LeftKnee => "kneeL",
            Self::RightKnee => "kneeR",
            Self::LeftAnkle => "ankleL",
            Self::RightAnkle => "ankleR",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|idx| idx.name() == name)
    }
}

impl std::fmt::Display for KeypointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Keypoint {
    /// メートル単位の3D座標 (x, y, z)
    pub metric: [f32; 3],
    /// 検出スコア (0.0〜1.0)
    #[serde(default = "default_score")]
    pub score: f32,
}

fn default_score() -> f32 { 1.0 }

impl Keypoint {
    pub fn new(metric: [f32; 3], score: f32) -> Self {
        Self { metric, score }
    }

    /// スコアが閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.metric[0], self.metric[1], self.metric[2])
    }
}

/// 1人分の姿勢。検出されなかったキーポイントは None
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "PoseRecord")]
pub struct Pose {
    pub keypoints: [Option<Keypoint>; KeypointIndex::COUNT],
}

impl Pose {
    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> Option<&Keypoint> {
        self.keypoints[index as usize].as_ref()
    }

    pub fn set(&mut self, index: KeypointIndex, keypoint: Keypoint) {
        self.keypoints[index as usize] = Some(keypoint);
    }
}

/// JSON上の表現: `{"points": {"hipL": {"metric": [..], "score": ..}, ...}}`
/// 未知の名前は無視する
#[derive(Deserialize)]
struct PoseRecord {
    #[serde(default)]
    points: HashMap<String, Keypoint>,
}

impl From<PoseRecord> for Pose {
    fn from(record: PoseRecord) -> Self {
        let mut pose = Pose::default();
        for (name, keypoint) in record.points {
            if let Some(index) = KeypointIndex::from_name(&name) {
                pose.set(index, keypoint);
            }
        }
        pose
    }
}

/// 1フレーム分の推論結果
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PoseResult {
    #[serde(default)]
    pub poses: Vec<Pose>,
}

impl PoseResult {
    pub fn new(poses: Vec<Pose>) -> Self {
        Self { poses }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 先頭の人物 (primary pose)
    pub fn primary(&self) -> Option<&Pose> {
        self.poses.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_index_count() {
        assert_eq!(KeypointIndex::COUNT, 17);
        assert_eq!(KeypointIndex::ALL.len(), KeypointIndex::COUNT);
    }

    #[test]
    fn test_keypoint_index_order() {
        for (i, idx) in KeypointIndex::ALL.iter().enumerate() {
            assert_eq!(*idx as usize, i);
        }
    }

    #[test]
    fn test_keypoint_name_roundtrip() {
        assert_eq!(KeypointIndex::from_name("hipL"), Some(KeypointIndex::LeftHip));
        assert_eq!(KeypointIndex::from_name("wristR"), Some(KeypointIndex::RightWrist));
        assert_eq!(KeypointIndex::from_name("tail"), None);
    }

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new([0.0, 1.0, 2.0], 0.7);
        assert!(kp.is_valid(0.5));
        assert!(!kp.is_valid(0.8));
    }

    #[test]
    fn test_pose_get_missing() {
        let mut pose = Pose::default();
        assert!(pose.get(KeypointIndex::Nose).is_none());

        pose.set(KeypointIndex::Nose, Keypoint::new([0.1, 1.6, 2.0], 0.9));
        let nose = pose.get(KeypointIndex::Nose).unwrap();
        assert_eq!(nose.metric, [0.1, 1.6, 2.0]);
        assert_eq!(nose.position(), Vector3::new(0.1, 1.6, 2.0));
    }

    #[test]
    fn test_pose_result_from_json() {
        let json = r#"{"poses":[{"points":{
            "hipL":{"metric":[0.1,1.0,2.0],"score":0.8},
            "wristR":{"metric":[-0.3,1.9,2.0]},
            "heelL":{"metric":[0.0,0.0,0.0]}
        }}]}"#;
        let result: PoseResult = serde_json::from_str(json).unwrap();
        let pose = result.primary().unwrap();
        assert_eq!(pose.get(KeypointIndex::LeftHip).unwrap().score, 0.8);
        assert_eq!(pose.get(KeypointIndex::RightWrist).unwrap().score, 1.0);
        assert!(pose.get(KeypointIndex::Nose).is_none());
    }

    #[test]
    fn test_pose_result_empty() {
        let result: PoseResult = serde_json::from_str(r#"{"poses":[]}"#).unwrap();
        assert!(result.primary().is_none());
        assert!(PoseResult::empty().primary().is_none());
    }
}
