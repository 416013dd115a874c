use super::{ModelResolver, VisionBackend};
use crate::error::{CactusError, Result};
use crate::intake::PreparedImage;
use cactus_common::{parse_extraction, Extraction, EXTRACTION_PROMPT};

/// 写真から鉢番号・学名・タイ語名を抽出
///
/// 呼び出しに失敗した場合はモデルキャッシュを破棄し、
/// 解決し直したモデルで1回だけ再試行する。
pub async fn extract(
    backend: &dyn VisionBackend,
    resolver: &mut ModelResolver,
    image: &PreparedImage,
) -> Result<Extraction> {
    let model = resolver.resolve(backend).await?;

    let reply = match backend.generate(&model, EXTRACTION_PROMPT, Some(image)).await {
        Ok(reply) => reply,
        Err(e) => {
            log::warn!("モデル {} での解析に失敗: {}", model, e);
            resolver.invalidate();
            let retry_model = resolver.resolve(backend).await?;
            match backend.generate(&retry_model, EXTRACTION_PROMPT, Some(image)).await {
                Ok(reply) => reply,
                Err(e) => {
                    // 失敗したモデルを次回に持ち越さない
                    resolver.invalidate();
                    return Err(e);
                }
            }
        }
    };

    log::debug!("解析レスポンス: {}", reply.chars().take(300).collect::<String>());

    parse_extraction(&reply).map_err(|e| CactusError::ApiParse(e.to_string()))
}
