use nalgebra::Vector3;

use super::OverlayNode;
use crate::config::Config;
use crate::gesture::{ArmPoints, GestureError, HandsUpClassifier};
use crate::pose::{KeypointIndex, PoseResult};

/// 1フレームの判定結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// 人物が検出されなかった
    NoPose,
    /// 必要なキーポイントが欠けていた（NoPose と同じ扱い）
    Incomplete(KeypointIndex),
    /// 骨ベクトルの長さが0で方向が求まらなかった
    Degenerate { from: KeypointIndex, to: KeypointIndex },
    Classified { hands_up: bool, cos_min: f32 },
}

impl From<GestureError> for FrameOutcome {
    fn from(err: GestureError) -> Self {
        match err {
            GestureError::MissingKeypoint(index) => Self::Incomplete(index),
            GestureError::DegenerateSegment { from, to } => Self::Degenerate { from, to },
        }
    }
}

/// 左右手首の中点
pub fn midpoint(wrist_l: &Vector3<f32>, wrist_r: &Vector3<f32>) -> Vector3<f32> {
    wrist_l.lerp(wrist_r, 0.5)
}

/// オーバーレイを手首の中点に置き、hands_up と同じ表示状態にする
pub fn update_overlay<O: OverlayNode + ?Sized>(
    overlay: &mut O,
    wrist_l: &Vector3<f32>,
    wrist_r: &Vector3<f32>,
    hands_up: bool,
) {
    place(overlay, wrist_l, wrist_r, 0.5, hands_up);
}

fn place<O: OverlayNode + ?Sized>(
    overlay: &mut O,
    wrist_l: &Vector3<f32>,
    wrist_r: &Vector3<f32>,
    anchor: f32,
    visible: bool,
) {
    overlay.set_position(wrist_l.lerp(wrist_r, anchor));
    overlay.set_visible(visible);
}

/// hands_up 状態を保持し、毎フレームオーバーレイを同期する
pub struct OverlayController {
    classifier: HandsUpClassifier,
    anchor: f32,
    hands_up: bool,
}

impl OverlayController {
    pub fn new(classifier: HandsUpClassifier) -> Self {
        Self {
            classifier,
            anchor: 0.5,
            hands_up: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            anchor: config.overlay.anchor,
            ..Self::new(HandsUpClassifier::from_config(&config.gesture))
        }
    }

    pub fn hands_up(&self) -> bool {
        self.hands_up
    }

    /// フレームごとに呼ばれる。状態更新とオーバーレイ反映はこの中で完結する
    pub fn update<O: OverlayNode + ?Sized>(
        &mut self,
        result: &PoseResult,
        overlay: Option<&mut O>,
    ) -> FrameOutcome {
        let Some(pose) = result.primary() else {
            self.force_down(overlay);
            return FrameOutcome::NoPose;
        };

        // 欠損・低スコアは位置を動かさずに隠す
        let points = match ArmPoints::from_pose(pose, self.classifier.min_score()) {
            Ok(points) => points,
            Err(err) => {
                self.force_down(overlay);
                return err.into();
            }
        };

        let outcome = match points.cosines() {
            Ok(cosines) => {
                let cos_min = cosines.min();
                let hands_up = self.classifier.decide(cos_min, self.hands_up);
                self.set_state(hands_up, Some(cos_min));
                FrameOutcome::Classified { hands_up, cos_min }
            }
            Err(err) => {
                tracing::warn!(%err, "forcing hands down");
                self.set_state(false, None);
                err.into()
            }
        };

        if let Some(overlay) = overlay {
            place(overlay, &points.wrist_l, &points.wrist_r, self.anchor, self.hands_up);
        }
        outcome
    }

    /// 位置はそのまま、非表示にする
    fn force_down<O: OverlayNode + ?Sized>(&mut self, overlay: Option<&mut O>) {
        self.set_state(false, None);
        if let Some(overlay) = overlay {
            overlay.set_visible(false);
        }
    }

    fn set_state(&mut self, hands_up: bool, cos_min: Option<f32>) {
        if hands_up != self.hands_up {
            tracing::debug!(hands_up, ?cos_min, "hands-up state changed");
        }
        self.hands_up = hands_up;
    }
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new(HandsUpClassifier::default())
    }
}
