//! Google Sheets v4 連携
//!
//! - values/{range}            読み込み・1行上書き
//! - values/{range}:append     追加
//! - :batchUpdate              行削除（deleteDimension）

use super::TableStore;
use crate::error::{CactusError, Result};
use crate::http::ensure_success;
use async_trait::async_trait;
use cactus_common::table::{
    full_range, header_range, header_row, record_to_row, records_from_rows, row_range,
    sheet_row_index, COLUMN_COUNT,
};
use cactus_common::{Record, HEADER_ROWS};
use serde::Deserialize;
use serde_json::{json, Value};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

pub struct GoogleSheet {
    client: reqwest::Client,
    token: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl GoogleSheet {
    pub fn new(client: reqwest::Client, token: String, spreadsheet_id: String, sheet_name: String) -> Self {
        Self {
            client,
            token,
            spreadsheet_id,
            sheet_name,
        }
    }

    fn base_url(&self) -> String {
        format!("{}/{}", SHEETS_API_BASE, self.spreadsheet_id)
    }

    /// values/{range}{suffix}（範囲はパス1要素としてエンコード）
    fn values_url(&self, range: &str, suffix: &str) -> Result<reqwest::Url> {
        values_url(&self.base_url(), range, suffix)
    }

    /// 範囲の全セルを文字列で取得
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "")?;
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        let resp = ensure_success(resp)
            .await
            .map_err(|e| CactusError::Sheet(format!("読み込み失敗 {}", e)))?;

        let range: ValueRange = resp.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// シート名 → 数値のsheetId（行削除に必要）
    async fn sheet_gid(&self) -> Result<i64> {
        let resp = self
            .client
            .get(self.base_url())
            .query(&[("fields", "sheets.properties")])
            .bearer_auth(&self.token)
            .send()
            .await?;
        let resp = ensure_success(resp)
            .await
            .map_err(|e| CactusError::Sheet(format!("シート情報取得失敗 {}", e)))?;

        let meta: SpreadsheetMeta = resp.json().await?;
        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == self.sheet_name)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| CactusError::Sheet(format!("シートがありません: {}", self.sheet_name)))
    }
}

fn values_url(base: &str, range: &str, suffix: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| CactusError::Sheet(format!("URL生成失敗: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| CactusError::Sheet(format!("URL生成失敗: {}", base)))?
        .push("values")
        .push(&format!("{}{}", range, suffix));
    Ok(url)
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TableStore for GoogleSheet {
    async fn load(&self) -> Result<Vec<Record>> {
        let rows = self.get_values(&full_range(&self.sheet_name)).await?;
        let data: Vec<Vec<String>> = rows.into_iter().skip(HEADER_ROWS).collect();
        Ok(records_from_rows(data))
    }

    async fn append(&self, record: &Record) -> Result<()> {
        let mut rows = Vec::new();
        // 空のシートには見出しを先に書く
        if self.get_values(&header_range(&self.sheet_name)).await?.is_empty() {
            rows.push(header_row());
        }
        rows.push(record_to_row(record));

        let url = self.values_url(&full_range(&self.sheet_name), ":append")?;
        let resp = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&self.token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        ensure_success(resp)
            .await
            .map_err(|e| CactusError::Sheet(format!("追加失敗 {}", e)))?;

        log::info!("台帳に追加: pot={} id={}", record.pot_number, record.id);
        Ok(())
    }

    async fn overwrite(&self, index: usize, record: &Record) -> Result<()> {
        let range = row_range(&self.sheet_name, index);
        let url = self.values_url(&range, "")?;
        let row = record_to_row(record);
        debug_assert_eq!(row.len(), COLUMN_COUNT);

        let resp = self
            .client
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.token)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        ensure_success(resp)
            .await
            .map_err(|e| CactusError::Sheet(format!("更新失敗 {}", e)))?;

        log::info!("台帳を更新: {} ({})", record.id, range);
        Ok(())
    }

    async fn remove_at(&self, index: usize) -> Result<()> {
        let gid = self.sheet_gid().await?;

        let start = sheet_row_index(index);
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": gid,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + 1,
                    }
                }
            }]
        });

        let url = format!("{}:batchUpdate", self.base_url());
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        ensure_success(resp)
            .await
            .map_err(|e| CactusError::Sheet(format!("削除失敗 {}", e)))?;

        log::info!("台帳から行を削除: {}行目", start + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Google Sheets {} ({})", self.spreadsheet_id, self.sheet_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_url_encodes_sheet_name() {
        let url = values_url(
            "https://sheets.googleapis.com/v4/spreadsheets/abc",
            &full_range("My Cactus"),
            ":append",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Cactus'!A:G:append"
        );

        let url = values_url("https://sheets.googleapis.com/v4/spreadsheets/abc", &row_range("a#b", 0), "").unwrap();
        assert!(url.as_str().ends_with("/values/'a%23b'!A2:G2"));
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(json!("abc")), "abc");
        assert_eq!(cell_to_string(json!(12)), "12");
        assert_eq!(cell_to_string(Value::Null), "");
    }

    #[test]
    fn test_value_range_without_values() {
        // 空のシートは "values" キー自体がない
        let range: ValueRange = serde_json::from_str(r#"{"range": "Sheet1!A1:G1000", "majorDimension": "ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_spreadsheet_meta_parse() {
        let json = r#"{"sheets": [{"properties": {"sheetId": 0, "title": "Sheet1", "index": 0}}]}"#;
        let meta: SpreadsheetMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.sheets[0].properties.sheet_id, 0);
        assert_eq!(meta.sheets[0].properties.title, "Sheet1");
    }
}
