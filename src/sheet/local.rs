//! ローカルxlsx台帳
//!
//! calamineで読み、変更のたびにrust_xlsxwriterでブック全体を書き直す。

use super::TableStore;
use crate::error::{CactusError, Result};
use async_trait::async_trait;
use cactus_common::table::{header_row, record_to_row, records_from_rows};
use cactus_common::{Record, HEADER_ROWS};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

pub const LOCAL_WORKBOOK_NAME: &str = "cactus.xlsx";

pub struct LocalSheet {
    path: PathBuf,
    sheet_name: String,
}

impl LocalSheet {
    pub fn new(path: PathBuf, sheet_name: String) -> Self {
        Self { path, sheet_name }
    }

    /// ディレクトリ配下の既定ブック
    pub fn in_dir(dir: &Path, sheet_name: String) -> Self {
        Self::new(dir.join(LOCAL_WORKBOOK_NAME), sheet_name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut workbook: Xlsx<_> = open_workbook(&self.path)
            .map_err(|e| CactusError::Sheet(format!("xlsx読み込み失敗: {}", e)))?;
        let range = workbook
            .worksheet_range(&self.sheet_name)
            .map_err(|e| CactusError::Sheet(format!("シート読み込み失敗: {}", e)))?;

        Ok(range
            .rows()
            .skip(HEADER_ROWS)
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    fn write_all(&self, records: &[Record]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut workbook = Workbook::new();
        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&self.sheet_name).map_err(xlsx_error)?;

            let rows = std::iter::once(header_row()).chain(records.iter().map(record_to_row));
            for (r, row) in rows.enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    worksheet
                        .write_string(r as u32, c as u16, value)
                        .map_err(xlsx_error)?;
                }
            }
        }
        workbook.save(&self.path).map_err(xlsx_error)?;
        Ok(())
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> CactusError {
    CactusError::Sheet(format!("xlsx書き込み失敗: {}", e))
}

#[async_trait]
impl TableStore for LocalSheet {
    async fn load(&self) -> Result<Vec<Record>> {
        Ok(records_from_rows(self.read_rows()?))
    }

    async fn append(&self, record: &Record) -> Result<()> {
        let mut records = self.load().await?;
        records.push(record.clone());
        self.write_all(&records)?;
        log::info!("ローカル台帳に追加: pot={} id={}", record.pot_number, record.id);
        Ok(())
    }

    async fn overwrite(&self, index: usize, record: &Record) -> Result<()> {
        let mut records = self.load().await?;
        let slot = records
            .get_mut(index)
            .ok_or_else(|| CactusError::Sheet(format!("行位置が範囲外: {}", index)))?;
        *slot = record.clone();
        self.write_all(&records)
    }

    async fn remove_at(&self, index: usize) -> Result<()> {
        let mut records = self.load().await?;
        if index >= records.len() {
            return Err(CactusError::Sheet(format!("行位置が範囲外: {}", index)));
        }
        records.remove(index);
        self.write_all(&records)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.path.display(), self.sheet_name)
    }
}
