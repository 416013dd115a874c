//! APIレスポンスパーサー
//!
//! Geminiの返答テキストからJSONを抽出し、Extractionに変換する

use crate::error::{Error, Result};
use crate::types::Extraction;
use serde_json::Value;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. ``` ... ``` ブロック
/// 3. 生の {...} オブジェクト
/// 4. エラー
///
/// # Examples
/// ```
/// use cactus_common::extract_json;
///
/// let response = "```json\n{\"species\": \"Mammillaria\"}\n```";
/// assert_eq!(extract_json(response).unwrap(), "{\"species\": \"Mammillaria\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 言語指定なしの ``` ... ``` ブロック
    if let Some(start_marker) = response.find("```") {
        let start = start_marker + 3;
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 解析レスポンスをパース
///
/// 数値で返された項目は文字列化し、null・欠落は空文字とする。
pub fn parse_extraction(response: &str) -> Result<Extraction> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("解析 JSONパースエラー: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::Parse("JSONオブジェクトではありません".into()))?;

    Ok(Extraction {
        pot_number: field_as_string(object.get("pot_number")),
        species: field_as_string(object.get("species")),
        thai_name: field_as_string(object.get("thai_name")),
    })
}

fn field_as_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
