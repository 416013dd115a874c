//! 台帳シートのレイアウト
//!
//! 列: Date | Pot No | Species | Thai Name | Image Link | Note | ID
//!
//! 先頭6列は既存シートと同じ並び。ID列は末尾に追加したため、
//! 古い行は読み込み時に空セルで補われる。

use crate::types::Record;

/// 列見出し
pub const COLUMNS: &[&str] = &[
    "Date",
    "Pot No",
    "Species",
    "Thai Name",
    "Image Link",
    "Note",
    "ID",
];

/// 固定列数
pub const COLUMN_COUNT: usize = 7;

/// データ行の前にある見出し行の数
pub const HEADER_ROWS: usize = 1;

/// 最終列の記号（A1表記）
pub const LAST_COLUMN: char = 'G';

const COL_DATE: usize = 0;
const COL_POT: usize = 1;
const COL_SPECIES: usize = 2;
const COL_THAI: usize = 3;
const COL_LINK: usize = 4;
const COL_NOTE: usize = 5;
const COL_ID: usize = 6;

/// 行を固定列数まで空文字で右詰め
///
/// 余分なセルはそのまま残す（Recordへの変換時に無視される）。
pub fn pad_row(mut row: Vec<String>) -> Vec<String> {
    if row.len() < COLUMN_COUNT {
        row.resize(COLUMN_COUNT, String::new());
    }
    row
}

/// 全セルが空の行か
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// 行 → レコード（短い行は補完）
pub fn record_from_row(row: Vec<String>) -> Record {
    let mut row = pad_row(row);
    let mut take = |i: usize| std::mem::take(&mut row[i]);

    let note = take(COL_NOTE);
    Record {
        date: take(COL_DATE),
        pot_number: take(COL_POT),
        species: take(COL_SPECIES),
        thai_name: take(COL_THAI),
        image_link: take(COL_LINK),
        note: if note.trim().is_empty() { None } else { Some(note) },
        id: take(COL_ID),
    }
}

/// レコード → 行（備考なしは空文字）
pub fn record_to_row(record: &Record) -> Vec<String> {
    let mut row = vec![String::new(); COLUMN_COUNT];
    row[COL_DATE] = record.date.clone();
    row[COL_POT] = record.pot_number.clone();
    row[COL_SPECIES] = record.species.clone();
    row[COL_THAI] = record.thai_name.clone();
    row[COL_LINK] = record.image_link.clone();
    row[COL_NOTE] = record.note.clone().unwrap_or_default();
    row[COL_ID] = record.id.clone();
    row
}

/// 見出し行
pub fn header_row() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// データ行（見出しを除く）をレコードに変換
///
/// 行位置をずらさないよう、途中の空行は空レコードとして残し、末尾の空行だけ落とす。
pub fn records_from_rows(mut rows: Vec<Vec<String>>) -> Vec<Record> {
    while rows.last().map(|r| is_blank_row(r)).unwrap_or(false) {
        rows.pop();
    }
    rows.into_iter().map(record_from_row).collect()
}

/// IDからデータ行の位置を探す
pub fn locate(records: &[Record], id: &str) -> Option<usize> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    records.iter().position(|r| r.id == id)
}

/// データ行位置 → シート上の行番号（A1表記、1始まり）
pub fn a1_row_number(index: usize) -> usize {
    index + HEADER_ROWS + 1
}

/// データ行位置 → シート上の行インデックス（0始まり、行削除API用）
pub fn sheet_row_index(index: usize) -> usize {
    index + HEADER_ROWS
}

/// A1表記用のシート名 "'My Cactus'"（' は '' にする）
pub fn quote_sheet_name(sheet_name: &str) -> String {
    format!("'{}'", sheet_name.replace('\'', "''"))
}

/// 全列の範囲 "'Sheet1'!A:G"
pub fn full_range(sheet_name: &str) -> String {
    format!("{}!A:{}", quote_sheet_name(sheet_name), LAST_COLUMN)
}

/// 見出しの先頭セル "'Sheet1'!A1:A1"
pub fn header_range(sheet_name: &str) -> String {
    format!("{}!A1:A1", quote_sheet_name(sheet_name))
}

/// 1行分の範囲 "'Sheet1'!A5:G5"
pub fn row_range(sheet_name: &str, index: usize) -> String {
    let n = a1_row_number(index);
    format!("{}!A{}:{}{}", quote_sheet_name(sheet_name), n, LAST_COLUMN, n)
}
