use anyhow::{Context, Result};

use crate::config::{Config, OutfitParams};
use crate::outfit::OutfitRules;
use crate::overlay::{FrameOutcome, OverlayController, OverlayNode, TextOverlay};
use crate::pose::PoseResult;
use crate::session::OutfitRequest;

/// 外部の描画パイプライン（衣装フィッティングと合成）
pub trait PoseRenderer {
    /// 映像の描画先（canvas など）
    type Surface: ?Sized;

    /// 1フレーム分の合成と描画
    fn update(&mut self, result: &PoseResult, surface: &Self::Surface) -> Result<()>;

    fn set_mirror(&mut self, mirror: bool);

    /// 既存モデルを破棄して新しいモデルを読み込む。rules が None ならアバター表示
    fn load_outfit(&mut self, file: &str, rules: Option<&OutfitRules>) -> Result<()>;
}

/// バンザイ検出とテキスト表示を追加したレンダラー
pub struct AvatarRenderer<R: PoseRenderer, O: OverlayNode = TextOverlay> {
    base: R,
    controller: OverlayController,
    text: Option<O>,
    url: String,
    outfit: Option<OutfitParams>,
}

impl<R: PoseRenderer> AvatarRenderer<R, TextOverlay> {
    /// 既定モデルとテキストオーバーレイ付きで作成
    pub fn from_config(base: R, config: &Config) -> Result<Self> {
        let entry = config
            .models
            .get(&config.default_model)
            .with_context(|| format!("Unknown default model '{}'", config.default_model))?;
        let outfit = if entry.avatar { None } else { entry.outfit.clone() };
        Ok(Self::new(base, OverlayController::from_config(config), entry.file.clone(), outfit)
            .with_overlay(TextOverlay::from_config(&config.overlay)))
    }
}

impl<R: PoseRenderer, O: OverlayNode> AvatarRenderer<R, O> {
    pub fn new(
        base: R,
        controller: OverlayController,
        url: impl Into<String>,
        outfit: Option<OutfitParams>,
    ) -> Self {
        Self {
            base,
            controller,
            text: None,
            url: url.into(),
            outfit,
        }
    }

    pub fn with_overlay(mut self, overlay: O) -> Self {
        self.text = Some(overlay);
        self
    }

    /// 初期モデルを読み込む
    pub fn load(&mut self) -> Result<()> {
        let url = self.url.clone();
        let outfit = self.outfit.clone();
        self.set_outfit(&url, outfit)
    }

    /// 衣装設定はそのままでモデルだけ差し替え
    pub fn set_model(&mut self, url: &str) -> Result<()> {
        let outfit = self.outfit.clone();
        self.set_outfit(url, outfit)
    }

    pub fn set_outfit(&mut self, url: &str, outfit: Option<OutfitParams>) -> Result<()> {
        let rules = outfit.as_ref().map(OutfitRules::compile).transpose()?;
        self.base
            .load_outfit(url, rules.as_ref())
            .with_context(|| format!("Failed to load model {}", url))?;
        tracing::info!(url, avatar = outfit.is_none(), "model loaded");
        self.url = url.to_string();
        self.outfit = outfit;
        Ok(())
    }

    pub fn apply(&mut self, request: &OutfitRequest) -> Result<()> {
        self.set_outfit(&request.file, request.outfit.clone())
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.base.set_mirror(mirror);
    }

    /// ジェスチャー判定とオーバーレイ更新を済ませてから基底レンダラーへ渡す
    pub fn update(&mut self, result: &PoseResult, surface: &R::Surface) -> Result<FrameOutcome> {
        let outcome = self.controller.update(result, self.text.as_mut());
        self.base.update(result, surface)?;
        Ok(outcome)
    }

    pub fn hands_up(&self) -> bool {
        self.controller.hands_up()
    }

    pub fn overlay(&self) -> Option<&O> {
        self.text.as_ref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn outfit(&self) -> Option<&OutfitParams> {
        self.outfit.as_ref()
    }

    pub fn base(&self) -> &R {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut R {
        &mut self.base
    }
}
