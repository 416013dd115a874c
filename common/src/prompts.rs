//! プロンプト定義
//!
//! - EXTRACTION_PROMPT: サボテン写真から鉢番号・学名・タイ語名を抽出
//! - SMOKE_TEST_PROMPT: モデル疎通確認用

/// 解析用プロンプト（画像と一緒に送信）
pub const EXTRACTION_PROMPT: &str = r#"Analyze this cactus image.
1. Read sequence number on pot label (as integer string).
2. Identify Species (Scientific Name).
3. Identify Thai Name.
Return JSON format: {"pot_number": "...", "species": "...", "thai_name": "..."}"#;

/// 疎通確認用の最小プロンプト
pub const SMOKE_TEST_PROMPT: &str = "hi";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_names_all_keys() {
        for key in ["pot_number", "species", "thai_name"] {
            assert!(EXTRACTION_PROMPT.contains(key), "{} がプロンプトにない", key);
        }
    }
}
