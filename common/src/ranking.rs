//! モデル候補の並べ替え
//!
//! 一覧APIで取得したモデルから生成可能なものを選び、
//! 高速版優先・実験版後回しの順に並べる。

use serde::{Deserialize, Serialize};

/// 生成メソッド名（これを持つモデルだけが候補）
pub const GENERATE_METHOD: &str = "generateContent";

/// モデル一覧APIの1件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelInfo {
    /// "models/gemini-1.5-flash" 形式
    pub name: String,
    pub display_name: String,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// "models/" を除いたID
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn can_generate(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_METHOD)
    }
}

/// 並べ替えの方針
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankPolicy {
    /// 高速版の目印（含むものを先に）
    pub fast_marker: String,
    /// 実験版の目印（含むものを後に）
    pub experimental_marker: String,
    /// 含むものは候補から除外
    pub skip_markers: Vec<String>,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            fast_marker: "flash".into(),
            experimental_marker: "exp".into(),
            skip_markers: Vec::new(),
        }
    }
}

impl RankPolicy {
    pub fn is_skipped(&self, id: &str) -> bool {
        self.skip_markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| id.contains(m.as_str()))
    }

    /// 並べ替えキー: (高速版でない, 実験版である)
    fn sort_key(&self, id: &str) -> (bool, bool) {
        let not_fast = self.fast_marker.is_empty() || !id.contains(self.fast_marker.as_str());
        let experimental =
            !self.experimental_marker.is_empty() && id.contains(self.experimental_marker.as_str());
        (not_fast, experimental)
    }
}

/// 生成可能なモデルIDを優先順に返す
///
/// 同順位の中では一覧APIの順序を保つ（安定ソート）。
pub fn rank_models(models: &[ModelInfo], policy: &RankPolicy) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for model in models.iter().filter(|m| m.can_generate()) {
        let id = model.id();
        if id.is_empty() || policy.is_skipped(id) || ids.iter().any(|x| x == id) {
            continue;
        }
        ids.push(id.to_string());
    }

    ids.sort_by_key(|id| policy.sort_key(id));
    ids
}
