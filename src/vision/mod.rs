//! AI解析モジュール
//!
//! - VisionBackend: モデル一覧と生成呼び出しの抽象
//! - ModelResolver: 使えるモデル名の決定（キャッシュ → 候補 → 一覧）
//! - extract: 写真から鉢番号・学名・タイ語名を取り出す

pub mod cache;
mod extract;
mod gemini;
mod resolver;

pub use extract::extract;
pub use gemini::GeminiClient;
pub use resolver::ModelResolver;

use crate::error::Result;
use crate::intake::PreparedImage;
use async_trait::async_trait;
use cactus_common::ModelInfo;

#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// 資格情報で見えるモデルをすべて返す
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// 1回の生成呼び出し。返答テキストを返す
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&PreparedImage>,
    ) -> Result<String>;
}
