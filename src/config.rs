use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// 起動時に選択されるモデル名
    #[serde(default = "default_model")]
    pub default_model: String,
    /// モデル名 → モデル定義
    #[serde(default = "default_models")]
    pub models: BTreeMap<String, ModelEntry>,
}

/// バンザイ判定のしきい値
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GestureConfig {
    /// cos最小値がこれを超えたら hands up
    #[serde(default = "default_raise_threshold")]
    pub raise_threshold: f32,
    /// cos最小値がこれを下回ったら hands down
    #[serde(default = "default_lower_threshold")]
    pub lower_threshold: f32,
    /// 必須キーポイントの最低スコア。下回る点は欠損扱い
    #[serde(default)]
    pub min_score: f32,
}

fn default_raise_threshold() -> f32 { 0.8 }
fn default_lower_threshold() -> f32 { 0.7 }

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            raise_threshold: default_raise_threshold(),
            lower_threshold: default_lower_threshold(),
            min_score: 0.0,
        }
    }
}

/// 手首間に浮かぶテキストモデル
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_text")]
    pub text: String,
    /// 左手首→右手首の補間係数 (0.5 = 中点)
    #[serde(default = "default_anchor")]
    pub anchor: f32,
    /// フォントサイズ（ジオメトリ単位）
    #[serde(default = "default_text_size")]
    pub size: f32,
    /// 押し出し深さ
    #[serde(default = "default_text_depth")]
    pub depth: f32,
    #[serde(default = "default_bevel_size")]
    pub bevel_size: f32,
    #[serde(default = "default_bevel_thickness")]
    pub bevel_thickness: f32,
    #[serde(default = "default_bevel_segments")]
    pub bevel_segments: u32,
    /// ジオメトリ単位 → メートル
    #[serde(default = "default_text_scale")]
    pub scale: f32,
    /// 0xRRGGBB
    #[serde(default = "default_text_color")]
    pub color: u32,
}

fn default_text() -> String { "HOORAY!!!".to_string() }
fn default_anchor() -> f32 { 0.5 }
fn default_text_size() -> f32 { 5.0 }
fn default_text_depth() -> f32 { 2.0 }
fn default_bevel_size() -> f32 { 0.3 }
fn default_bevel_thickness() -> f32 { 1.0 }
fn default_bevel_segments() -> u32 { 10 }
fn default_text_scale() -> f32 { 0.01 }
fn default_text_color() -> u32 { 0x3BDB9B }

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            text: default_text(),
            anchor: default_anchor(),
            size: default_text_size(),
            depth: default_text_depth(),
            bevel_size: default_bevel_size(),
            bevel_thickness: default_bevel_thickness(),
            bevel_segments: default_bevel_segments(),
            scale: default_text_scale(),
            color: default_text_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// 起動時にリアカメラを使うか（URLの `rear` パラメータでも有効化）
    #[serde(default)]
    pub rear: bool,
}

fn default_camera_width() -> u32 { 1920 }
fn default_camera_height() -> u32 { 1080 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_camera_width(),
            height: default_camera_height(),
            rear: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// 録画時間（秒）
    #[serde(default = "default_record_secs")]
    pub duration_secs: u64,
    /// ダウンロードファイル名（拡張子なし）
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

fn default_record_secs() -> u64 { 10 }
fn default_file_stem() -> String { "capture".to_string() }

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_record_secs(),
            file_stem: default_file_stem(),
        }
    }
}

/// 切り替え可能なモデル
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelEntry {
    /// glTFファイル
    pub file: String,
    /// true: アバターとしてそのまま表示 / false: 衣装として体にフィット
    #[serde(default)]
    pub avatar: bool,
    #[serde(default)]
    pub outfit: Option<OutfitParams>,
}

/// 衣装メッシュのパターン（正規表現）
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutfitParams {
    /// 体の奥行きを隠すオクルーダーとして扱うメッシュ
    #[serde(default)]
    pub occluders: Vec<String>,
    /// 非表示にするメッシュ
    #[serde(default)]
    pub hidden: Vec<String>,
}

fn default_model() -> String { "onesie".to_string() }

fn default_models() -> BTreeMap<String, ModelEntry> {
    let occluders = vec!["Head$".to_string(), "Body".to_string()];
    let mut models = BTreeMap::new();
    models.insert(
        "onesie".to_string(),
        ModelEntry {
            file: "onesie.glb".to_string(),
            avatar: false,
            outfit: Some(OutfitParams {
                occluders: occluders.clone(),
                hidden: ["Eye", "Teeth", "Footwear"].map(String::from).to_vec(),
            }),
        },
    );
    models.insert(
        "jacket".to_string(),
        ModelEntry {
            file: "jacket.glb".to_string(),
            avatar: false,
            outfit: Some(OutfitParams {
                occluders,
                hidden: ["Eye", "Teeth", "Bottom", "Footwear", "Glasses"]
                    .map(String::from)
                    .to_vec(),
            }),
        },
    );
    models
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            overlay: OverlayConfig::default(),
            camera: CameraConfig::default(),
            recorder: RecorderConfig::default(),
            default_model: default_model(),
            models: default_models(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// ファイルが無ければデフォルト。壊れている場合はエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.gesture;
        if g.raise_threshold <= g.lower_threshold {
            bail!(
                "gesture.raise_threshold ({}) must be greater than gesture.lower_threshold ({})",
                g.raise_threshold,
                g.lower_threshold
            );
        }
        if !(-1.0..=1.0).contains(&g.raise_threshold) || !(-1.0..=1.0).contains(&g.lower_threshold) {
            bail!("gesture thresholds must lie in [-1, 1]");
        }
        if !(0.0..=1.0).contains(&g.min_score) {
            bail!("gesture.min_score ({}) must lie in [0, 1]", g.min_score);
        }
        if !(0.0..=1.0).contains(&self.overlay.anchor) {
            bail!("overlay.anchor ({}) must lie in [0, 1]", self.overlay.anchor);
        }
        if !self.models.contains_key(&self.default_model) {
            bail!("default_model '{}' is not defined in [models]", self.default_model);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gesture.raise_threshold, 0.8);
        assert_eq!(config.gesture.lower_threshold, 0.7);
        assert_eq!(config.overlay.text, "HOORAY!!!");
        assert_eq!(config.overlay.anchor, 0.5);
        assert_eq!((config.camera.width, config.camera.height), (1920, 1080));
        assert_eq!(config.recorder.duration_secs, 10);
        assert_eq!(config.default_model, "onesie");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_models() {
        let config = Config::default();
        let jacket = &config.models["jacket"];
        assert_eq!(jacket.file, "jacket.glb");
        assert!(!jacket.avatar);
        let outfit = jacket.outfit.as_ref().unwrap();
        assert_eq!(outfit.occluders, vec!["Head$", "Body"]);
        assert!(outfit.hidden.contains(&"Glasses".to_string()));
        assert!(!config.models["onesie"].outfit.as_ref().unwrap().hidden.contains(&"Bottom".to_string()));
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gesture.raise_threshold, 0.8);
        assert_eq!(config.models.len(), 2);
    }

    #[test]
    fn test_parse_partial_tables() {
        let config = Config::parse(
            r#"
            default_model = "dress"

            [gesture]
            raise_threshold = 0.9

            [models.dress]
            file = "dress.glb"
            avatar = true
            "#,
        )
        .unwrap();
        assert_eq!(config.gesture.raise_threshold, 0.9);
        assert_eq!(config.gesture.lower_threshold, 0.7);
        assert_eq!(config.models.len(), 1);
        assert!(config.models["dress"].avatar);
        assert!(config.models["dress"].outfit.is_none());
    }

    #[test]
    fn test_reject_inverted_thresholds() {
        let err = Config::parse("[gesture]\nraise_threshold = 0.6\n").unwrap_err();
        assert!(err.to_string().contains("raise_threshold"));
    }

    #[test]
    fn test_min_score() {
        assert_eq!(Config::default().gesture.min_score, 0.0);
        let config = Config::parse("[gesture]\nmin_score = 0.4\n").unwrap();
        assert_eq!(config.gesture.min_score, 0.4);
        assert!(Config::parse("[gesture]\nmin_score = 1.5\n").is_err());
    }

    #[test]
    fn test_reject_unknown_default_model() {
        assert!(Config::parse("default_model = \"cape\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[recorder]\nduration_secs = 5").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.recorder.duration_secs, 5);
        assert_eq!(config.recorder.file_stem, "capture");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(Config::load(&path).is_err());
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.default_model, "onesie");
    }
}
