use nalgebra::Vector3;
use thiserror::Error;

use crate::config::GestureConfig;
use crate::pose::{KeypointIndex, Pose};

/// これより短い骨ベクトルは方向を持たないとみなす（メートル）
const MIN_SEGMENT_LENGTH: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GestureError {
    #[error("keypoint {0} is missing")]
    MissingKeypoint(KeypointIndex),
    #[error("segment {from} -> {to} has no direction")]
    DegenerateSegment { from: KeypointIndex, to: KeypointIndex },
}

/// 判定に使う8点（メートル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPoints {
    pub hip_l: Vector3<f32>,
    pub hip_r: Vector3<f32>,
    pub shoulder_l: Vector3<f32>,
    pub shoulder_r: Vector3<f32>,
    pub elbow_l: Vector3<f32>,
    pub elbow_r: Vector3<f32>,
    pub wrist_l: Vector3<f32>,
    pub wrist_r: Vector3<f32>,
}

impl ArmPoints {
    /// 8点のどれかが欠けている、またはスコアが min_score 未満ならエラー
    pub fn from_pose(pose: &Pose, min_score: f32) -> Result<Self, GestureError> {
        let point = |index: KeypointIndex| {
            pose.get(index)
                .filter(|kp| kp.is_valid(min_score))
                .map(|kp| kp.position())
                .ok_or(GestureError::MissingKeypoint(index))
        };
        Ok(Self {
            hip_l: point(KeypointIndex::LeftHip)?,
            hip_r: point(KeypointIndex::RightHip)?,
            shoulder_l: point(KeypointIndex::LeftShoulder)?,
            shoulder_r: point(KeypointIndex::RightShoulder)?,
            elbow_l: point(KeypointIndex::LeftElbow)?,
            elbow_r: point(KeypointIndex::RightElbow)?,
            wrist_l: point(KeypointIndex::LeftWrist)?,
            wrist_r: point(KeypointIndex::RightWrist)?,
        })
    }

    /// 胴体・上腕・前腕の向きの一致度
    pub fn cosines(&self) -> Result<ArmCosines, GestureError> {
        use KeypointIndex::*;
        let torso_l = direction(self.hip_l, self.shoulder_l, LeftHip, LeftShoulder)?;
        let torso_r = direction(self.hip_r, self.shoulder_r, RightHip, RightShoulder)?;
        let arm_l = direction(self.shoulder_l, self.elbow_l, LeftShoulder, LeftElbow)?;
        let arm_r = direction(self.shoulder_r, self.elbow_r, RightShoulder, RightElbow)?;
        let fore_arm_l = direction(self.elbow_l, self.wrist_l, LeftElbow, LeftWrist)?;
        let fore_arm_r = direction(self.elbow_r, self.wrist_r, RightElbow, RightWrist)?;

        // 単位ベクトル同士の内積 = なす角のcos。平行なら1に近い
        Ok(ArmCosines {
            arm_l: torso_l.dot(&arm_l),
            arm_r: torso_r.dot(&arm_r),
            fore_arm_l: fore_arm_l.dot(&arm_l),
            fore_arm_r: fore_arm_r.dot(&arm_r),
        })
    }
}

/// from → to の単位ベクトル
fn direction(
    from: Vector3<f32>,
    to: Vector3<f32>,
    from_idx: KeypointIndex,
    to_idx: KeypointIndex,
) -> Result<Vector3<f32>, GestureError> {
    let degenerate = GestureError::DegenerateSegment { from: from_idx, to: to_idx };
    let v = to - from;
    if !v.iter().all(|c| c.is_finite()) {
        return Err(degenerate);
    }
    v.try_normalize(MIN_SEGMENT_LENGTH).ok_or(degenerate)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmCosines {
    /// 左胴体・左上腕
    pub arm_l: f32,
    /// 右胴体・右上腕
    pub arm_r: f32,
    /// 左前腕・左上腕
    pub fore_arm_l: f32,
    /// 右前腕・右上腕
    pub fore_arm_r: f32,
}

impl ArmCosines {
    /// 一番曲がっている関節が全体を決める
    pub fn min(&self) -> f32 {
        self.arm_l.min(self.arm_r).min(self.fore_arm_l).min(self.fore_arm_r)
    }
}

/// バンザイ判定（ヒステリシス付き）
#[derive(Debug, Clone, Copy)]
pub struct HandsUpClassifier {
    raise_threshold: f32,
    lower_threshold: f32,
    min_score: f32,
}

impl HandsUpClassifier {
    pub fn new(raise_threshold: f32, lower_threshold: f32) -> Self {
        Self {
            raise_threshold,
            lower_threshold,
            min_score: 0.0,
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.raise_threshold, config.lower_threshold).with_min_score(config.min_score)
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// 8点と前フレームの状態から新しい状態を返す
    pub fn classify(&self, points: &ArmPoints, previous: bool) -> Result<bool, GestureError> {
        let cosines = points.cosines()?;
        Ok(self.decide(cosines.min(), previous))
    }

    /// raise を超えたら上げ、lower を下回ったら下げ、その間は前の状態を維持
    pub fn decide(&self, cos_min: f32, previous: bool) -> bool {
        if cos_min > self.raise_threshold {
            true
        } else if cos_min < self.lower_threshold {
            false
        } else {
            previous
        }
    }
}

impl Default for HandsUpClassifier {
    fn default() -> Self {
        Self::from_config(&GestureConfig::default())
    }
}
