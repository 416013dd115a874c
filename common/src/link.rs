//! 画像リンクの生成と修復
//!
//! ファイル名: Cactus_<鉢番号>_<yyyyMMdd_HHmmss>.jpg
//! 公開URL:   https://<host>/<bucket>/<ファイル名>

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BLOB_FILE_NAME: Regex =
        Regex::new(r"Cactus_[\p{Alphabetic}\p{N}_-]*?_\d{8}_\d{6}\.jpg").expect("valid regex");
}

/// 鉢番号をファイル名用に整形（文字・数字・-・_ 以外は '-'）
///
/// 残す文字は `BLOB_FILE_NAME` の文字クラス（Alphabetic と N）と一致させる。
pub fn sanitize_pot_number(pot_number: &str) -> String {
    pot_number
        .trim()
        .chars()
        .map(|c| if c.is_alphabetic() || c.is_numeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// アップロード用ファイル名を生成
///
/// `timestamp` は "yyyyMMdd_HHmmss" 形式。同一秒・同一鉢番号では衝突する。
pub fn blob_file_name(pot_number: &str, timestamp: &str) -> String {
    format!("Cactus_{}_{}.jpg", sanitize_pot_number(pot_number), timestamp)
}

/// 公開URLの接頭辞
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBase {
    prefix: String,
}

impl LinkBase {
    /// https://<host>/<bucket>
    pub fn new(host: &str, bucket: &str) -> Self {
        Self::from_prefix(format!("https://{}/{}", host.trim_end_matches('/'), bucket))
    }

    /// 任意の接頭辞（ローカル保存の file:// など）
    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, file_name: &str) -> String {
        format!("{}/{}", self.prefix, file_name)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// 文字列中からアップロード済みファイル名を探す
pub fn find_blob_file_name(stored: &str) -> Option<&str> {
    BLOB_FILE_NAME.find(stored).map(|m| m.as_str())
}

/// 壊れたリンクを正規のURLに復元
///
/// すでに正規の形、またはファイル名が見つからない場合は None。
pub fn repair_image_link(stored: &str, base: &LinkBase) -> Option<String> {
    let file_name = find_blob_file_name(stored)?;
    let canonical = base.url(file_name);
    if stored.trim() == canonical {
        None
    } else {
        Some(canonical)
    }
}
