//! 対話式フォームと表示
//!
//! 解析結果を初期値にした入力欄、確認、スピナー、一覧表示。

use crate::error::{CactusError, Result};
use crate::session::ExtractionOutcome;
use cactus_common::{Extraction, Record, RecordPatch};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// 処理中表示
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// 解析結果の表示（失敗は理由を別表示）
pub fn render_outcome(outcome: &ExtractionOutcome) {
    match outcome {
        ExtractionOutcome::Extracted(e) => {
            println!("✔ 解析完了");
            println!("  鉢番号:     {}", e.pot_number);
            println!("  学名:       {}", e.species);
            println!("  タイ語名:   {}", e.thai_name);
        }
        ExtractionOutcome::Failed(reason) => {
            println!("⚠ AI解析できませんでした: {}", reason);
            println!("  手入力で続行できます");
        }
    }
}

fn text(prompt: &str, initial: &str) -> Result<String> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| CactusError::Prompt(e.to_string()))?;
    Ok(input.trim().to_string())
}

/// 保存前の編集フォーム
pub fn edit_fields(initial: &Extraction, note: Option<&str>) -> Result<(Extraction, Option<String>)> {
    let fields = Extraction {
        pot_number: text("鉢番号", &initial.pot_number)?,
        species: text("学名", &initial.species)?,
        thai_name: text("タイ語名", &initial.thai_name)?,
    };
    let note = text("備考", note.unwrap_or_default())?;
    Ok((fields, Some(note).filter(|n| !n.is_empty())))
}

/// 既存レコードの編集フォーム（変わった項目だけを返す）
pub fn edit_record(record: &Record) -> Result<RecordPatch> {
    let current_note = record.note.clone().unwrap_or_default();

    let pot_number = text("鉢番号", &record.pot_number)?;
    let species = text("学名", &record.species)?;
    let thai_name = text("タイ語名", &record.thai_name)?;
    let image_link = text("画像リンク", &record.image_link)?;
    let note = text("備考", &current_note)?;

    let changed = |new: String, old: &str| if new != old { Some(new) } else { None };
    Ok(RecordPatch {
        pot_number: changed(pot_number, &record.pot_number),
        species: changed(species, &record.species),
        thai_name: changed(thai_name, &record.thai_name),
        image_link: changed(image_link, &record.image_link),
        note: changed(note, &current_note),
        ..Default::default()
    })
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| CactusError::Prompt(e.to_string()))
}

/// 一覧表示
pub fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("(レコードなし)");
        return;
    }

    for (i, r) in records.iter().enumerate() {
        // 途中の空行
        if r.is_blank() {
            continue;
        }
        let id = if r.has_id() { r.id.as_str() } else { "-" };
        println!(
            "{:>4}  {}  {}  #{}  {} / {}",
            i + 1,
            id,
            r.date,
            r.pot_number,
            r.species,
            r.thai_name
        );
        if !r.image_link.is_empty() {
            println!("      {}", r.image_link);
        }
        if let Some(ref note) = r.note {
            println!("      備考: {}", note);
        }
    }

    let missing = records.iter().filter(|r| !r.has_id() && !r.is_blank()).count();
    if missing > 0 {
        println!("\n⚠ IDのない行が{}件あります。`cactus repair` で補完してください", missing);
    }
}
