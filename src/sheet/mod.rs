//! 台帳（表）モジュール
//!
//! - GoogleSheet: Google Sheets v4 REST
//! - LocalSheet: ローカルxlsx（オフライン用）
//!
//! 更新・削除はID列で対象行を探し、読み込み直後の行位置に対して行う。

mod google;
mod local;

pub use google::GoogleSheet;
pub use local::{LocalSheet, LOCAL_WORKBOOK_NAME};

use crate::error::{CactusError, Result};
use async_trait::async_trait;
use cactus_common::table::locate;
use cactus_common::{Record, RecordPatch};

#[async_trait]
pub trait TableStore: Send + Sync {
    /// 見出しを除く全行（固定列数に補完済み）
    async fn load(&self) -> Result<Vec<Record>>;

    /// 末尾に1行追加
    async fn append(&self, record: &Record) -> Result<()>;

    /// データ行位置 `index` の行を上書き
    async fn overwrite(&self, index: usize, record: &Record) -> Result<()>;

    /// データ行位置 `index` の行を削除（以降の行は1つ上に詰まる）
    async fn remove_at(&self, index: usize) -> Result<()>;

    /// 表示用の保存先
    fn describe(&self) -> String;

    /// 指定IDの行を部分更新し、更新後のレコードを返す
    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<Record> {
        let records = self.load().await?;
        let index = require_position(&records, id)?;

        let mut record = records[index].clone();
        record.apply(patch);
        self.overwrite(index, &record).await?;
        Ok(record)
    }

    /// 指定IDの行を削除し、削除したレコードを返す
    async fn delete(&self, id: &str) -> Result<Record> {
        let records = self.load().await?;
        let index = require_position(&records, id)?;

        self.remove_at(index).await?;
        Ok(records[index].clone())
    }
}

fn require_position(records: &[Record], id: &str) -> Result<usize> {
    locate(records, id).ok_or_else(|| CactusError::RecordNotFound(id.to_string()))
}
