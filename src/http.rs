//! HTTPクライアント共通処理

use crate::error::Result;
use std::time::Duration;

pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// 2xx以外はステータスと本文をまとめたメッセージにする
pub async fn ensure_success(
    resp: reqwest::Response,
) -> std::result::Result<reqwest::Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("{}: {}", status, body.trim()))
}
