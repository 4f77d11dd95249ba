use anyhow::{Context, Result};
use regex::Regex;

use crate::config::OutfitParams;

/// メッシュに対する扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshAction {
    /// 体の形で奥行きだけ書き込み、背後の衣装を隠す
    Occluder,
    /// 描画しない
    Hidden,
    Visible,
}

#[derive(Debug, Clone)]
pub struct MeshRule {
    pub pattern: Regex,
    pub action: MeshAction,
}

/// モデル読み込み時に一度だけ評価するメッシュ名ルール
/// 先にマッチしたルールが優先（オクルーダー → 非表示 の順）
#[derive(Debug, Clone, Default)]
pub struct OutfitRules {
    rules: Vec<MeshRule>,
}

impl OutfitRules {
    pub fn compile(params: &OutfitParams) -> Result<Self> {
        let occluders = params.occluders.iter().map(|p| (p, MeshAction::Occluder));
        let hidden = params.hidden.iter().map(|p| (p, MeshAction::Hidden));
        let rules = occluders
            .chain(hidden)
            .map(|(pattern, action)| -> Result<MeshRule> {
                let pattern = Regex::new(pattern)
                    .with_context(|| format!("Invalid mesh pattern '{}'", pattern))?;
                Ok(MeshRule { pattern, action })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[MeshRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn resolve(&self, mesh_name: &str) -> MeshAction {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(mesh_name))
            .map(|rule| rule.action)
            .unwrap_or(MeshAction::Visible)
    }
}
