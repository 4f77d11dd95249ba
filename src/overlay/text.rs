use nalgebra::Vector3;

use super::OverlayNode;
use crate::config::OverlayConfig;

/// 押し出しテキストの見た目
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub depth: f32,
    pub bevel_size: f32,
    pub bevel_thickness: f32,
    pub bevel_segments: u32,
    /// ジオメトリ単位 → メートル
    pub scale: f32,
    pub color: u32,
}

impl TextStyle {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            size: config.size,
            depth: config.depth,
            bevel_size: config.bevel_size,
            bevel_thickness: config.bevel_thickness,
            bevel_segments: config.bevel_segments,
            scale: config.scale,
            color: config.color,
        }
    }

    /// 文字の高さ（メートル）
    pub fn height_m(&self) -> f32 {
        self.size * self.scale
    }
}

/// 手首の間に浮かぶテキスト。生成直後は非表示
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub style: TextStyle,
    pub position: Vector3<f32>,
    pub visible: bool,
}

impl TextOverlay {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            position: Vector3::zeros(),
            visible: false,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.text.clone(), TextStyle::from_config(config))
    }
}

impl OverlayNode for TextOverlay {
    fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
