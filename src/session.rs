use anyhow::{Context, Result};
use std::collections::BTreeMap;
use url::form_urlencoded;

use crate::config::{CameraConfig, Config, ModelEntry, OutfitParams};

/// カメラ起動パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSetup {
    pub width: u32,
    pub height: u32,
    pub rear: bool,
}

impl CameraSetup {
    /// フロントカメラのときだけ鏡像表示
    pub fn mirror(&self) -> bool {
        !self.rear
    }
}

/// レンダラーへのモデル差し替え要求
#[derive(Debug, Clone, PartialEq)]
pub struct OutfitRequest {
    pub model: String,
    pub file: String,
    /// None ならアバターとして表示
    pub outfit: Option<OutfitParams>,
}

/// UIイベントで書き換わるアプリ状態
#[derive(Debug, Clone)]
pub struct SessionState {
    model: String,
    avatar: bool,
    rear: bool,
    camera: CameraConfig,
    models: BTreeMap<String, ModelEntry>,
}

impl SessionState {
    pub fn new(config: &Config) -> Result<Self> {
        let entry = config
            .models
            .get(&config.default_model)
            .with_context(|| format!("Unknown default model '{}'", config.default_model))?;
        Ok(Self {
            model: config.default_model.clone(),
            avatar: entry.avatar,
            rear: config.camera.rear,
            camera: config.camera,
            models: config.models.clone(),
        })
    }

    /// URLクエリ（`?rear` など）を反映して作成
    pub fn from_query(config: &Config, query: &str) -> Result<Self> {
        let mut session = Self::new(config)?;
        let query = query.trim_start_matches('?');
        if form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "rear") {
            session.rear = true;
        }
        Ok(session)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn avatar(&self) -> bool {
        self.avatar
    }

    pub fn rear(&self) -> bool {
        self.rear
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn camera_setup(&self) -> CameraSetup {
        CameraSetup {
            width: self.camera.width,
            height: self.camera.height,
            rear: self.rear,
        }
    }

    /// カメラ切り替えボタン
    pub fn toggle_camera(&mut self) -> CameraSetup {
        self.rear = !self.rear;
        tracing::info!(rear = self.rear, "camera switched");
        self.camera_setup()
    }

    /// 現在のモデルの差し替え要求
    pub fn outfit_request(&self) -> Result<OutfitRequest> {
        let entry = self
            .models
            .get(&self.model)
            .with_context(|| format!("Unknown model '{}'", self.model))?;
        Ok(OutfitRequest {
            model: self.model.clone(),
            file: entry.file.clone(),
            outfit: if self.avatar { None } else { entry.outfit.clone() },
        })
    }

    /// アバター/衣装スイッチ
    pub fn set_avatar(&mut self, avatar: bool) -> Result<OutfitRequest> {
        self.avatar = avatar;
        self.outfit_request()
    }

    /// モデル選択。未知の名前は無視して None
    pub fn select_model(&mut self, name: &str) -> Option<OutfitRequest> {
        let entry = self.models.get(name)?;
        self.avatar = entry.avatar;
        self.model = name.to_string();
        tracing::info!(model = name, avatar = self.avatar, "model selected");
        Some(OutfitRequest {
            model: self.model.clone(),
            file: entry.file.clone(),
            outfit: if self.avatar { None } else { entry.outfit.clone() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let session = SessionState::new(&Config::default()).unwrap();
        assert_eq!(session.model(), "onesie");
        assert!(!session.avatar());
        assert!(!session.rear());
        assert!(session.camera_setup().mirror());
        assert_eq!(session.model_names().collect::<Vec<_>>(), vec!["jacket", "onesie"]);
    }

    #[test]
    fn test_from_query_rear() {
        let config = Config::default();
        assert!(SessionState::from_query(&config, "?rear").unwrap().rear());
        assert!(SessionState::from_query(&config, "debug=1&rear=").unwrap().rear());
        assert!(!SessionState::from_query(&config, "?rearview=1").unwrap().rear());
        assert!(!SessionState::from_query(&config, "").unwrap().rear());
    }

    #[test]
    fn test_toggle_camera() {
        let mut session = SessionState::new(&Config::default()).unwrap();
        let setup = session.toggle_camera();
        assert_eq!(setup, CameraSetup { width: 1920, height: 1080, rear: true });
        assert!(!setup.mirror());
        let setup = session.toggle_camera();
        assert!(!setup.rear);
        assert!(setup.mirror());
    }

    #[test]
    fn test_set_avatar() {
        let mut session = SessionState::new(&Config::default()).unwrap();
        let request = session.set_avatar(true).unwrap();
        assert_eq!(request.file, "onesie.glb");
        assert!(request.outfit.is_none());

        let request = session.set_avatar(false).unwrap();
        assert_eq!(request.outfit.unwrap().hidden, vec!["Eye", "Teeth", "Footwear"]);
    }

    #[test]
    fn test_select_model() {
        let mut session = SessionState::new(&Config::default()).unwrap();
        session.set_avatar(true).unwrap();

        let request = session.select_model("jacket").unwrap();
        assert_eq!(session.model(), "jacket");
        // モデル既定値に戻る
        assert!(!session.avatar());
        assert_eq!(request.model, "jacket");
        assert_eq!(request.file, "jacket.glb");
        assert!(request.outfit.unwrap().hidden.contains(&"Glasses".to_string()));
    }

    #[test]
    fn test_select_unknown_model() {
        let mut session = SessionState::new(&Config::default()).unwrap();
        assert!(session.select_model("cape").is_none());
        assert_eq!(session.model(), "onesie");
    }

    #[test]
    fn test_avatar_model_has_no_outfit() {
        let config = Config::parse(
            r#"
            default_model = "robot"
            [models.robot]
            file = "robot.glb"
            avatar = true
            [models.robot.outfit]
            hidden = ["Eye"]
            "#,
        )
        .unwrap();
        let session = SessionState::new(&config).unwrap();
        assert!(session.avatar());
        assert!(session.outfit_request().unwrap().outfit.is_none());
    }
}
