pub mod controller;
pub mod text;

pub use controller::{midpoint, update_overlay, FrameOutcome, OverlayController};
pub use text::{TextOverlay, TextStyle};

use nalgebra::Vector3;

/// シーングラフ上の位置と表示状態を持つオブジェクト
pub trait OverlayNode {
    fn set_position(&mut self, position: Vector3<f32>);
    fn set_visible(&mut self, visible: bool);
}
