//! 台帳の型定義
//!
//! - Extraction: AI解析の出力（鉢番号・学名・タイ語名）
//! - Record: 台帳の1行
//! - RecordPatch: 編集時の部分更新

use serde::{Deserialize, Serialize};

/// AI解析結果
///
/// すべてのフィールドは欠落時に空文字となる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extraction {
    pub pot_number: String,
    pub species: String,
    pub thai_name: String,
}

impl Extraction {
    /// 3項目すべてが空か
    pub fn is_empty(&self) -> bool {
        self.pot_number.trim().is_empty()
            && self.species.trim().is_empty()
            && self.thai_name.trim().is_empty()
    }
}

/// 台帳レコード
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// UUID（id列導入前の行は空）
    pub id: String,
    /// 登録日 (YYYY-MM-DD)
    pub date: String,
    pub pot_number: String,
    pub species: String,
    pub thai_name: String,
    pub image_link: String,
    pub note: Option<String>,
}

impl Record {
    /// 解析結果から新規レコードを作成
    pub fn from_extraction(
        id: String,
        date: String,
        extraction: Extraction,
        image_link: String,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            date,
            pot_number: extraction.pot_number,
            species: extraction.species,
            thai_name: extraction.thai_name,
            image_link,
            note: note.filter(|n| !n.trim().is_empty()),
        }
    }

    /// id列が埋まっているか
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// 全項目が空（空白のみを含む）の行か
    ///
    /// 表の途中の空行は位置を保つために空レコードとして読み込まれる。
    pub fn is_blank(&self) -> bool {
        [
            &self.id,
            &self.date,
            &self.pot_number,
            &self.species,
            &self.thai_name,
            &self.image_link,
        ]
        .iter()
        .all(|v| v.trim().is_empty())
            && self.note.as_deref().map_or(true, |n| n.trim().is_empty())
    }

    /// 部分更新を適用
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(ref v) = patch.date {
            self.date = v.clone();
        }
        if let Some(ref v) = patch.pot_number {
            self.pot_number = v.clone();
        }
        if let Some(ref v) = patch.species {
            self.species = v.clone();
        }
        if let Some(ref v) = patch.thai_name {
            self.thai_name = v.clone();
        }
        if let Some(ref v) = patch.image_link {
            self.image_link = v.clone();
        }
        if let Some(ref v) = patch.note {
            self.note = if v.trim().is_empty() { None } else { Some(v.clone()) };
        }
        if let Some(ref v) = patch.id {
            self.id = v.clone();
        }
    }
}

/// 編集内容（Noneの項目は変更しない）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub id: Option<String>,
    pub date: Option<String>,
    pub pot_number: Option<String>,
    pub species: Option<String>,
    pub thai_name: Option<String>,
    pub image_link: Option<String>,
    pub note: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.date.is_none()
            && self.pot_number.is_none()
            && self.species.is_none()
            && self.thai_name.is_none()
            && self.image_link.is_none()
            && self.note.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_deserialize_missing_fields() {
        let e: Extraction = serde_json::from_str(r#"{"species": "Astrophytum asterias"}"#).unwrap();
        assert_eq!(e.species, "Astrophytum asterias");
        assert_eq!(e.pot_number, "");
        assert_eq!(e.thai_name, "");
        assert!(!e.is_empty());
    }

    #[test]
    fn test_apply_patch_keeps_other_fields() {
        let mut record = Record {
            id: "a".into(),
            date: "2025-01-18".into(),
            pot_number: "12".into(),
            species: "Gymnocalycium mihanovichii".into(),
            thai_name: "ยิมโน".into(),
            image_link: "https://example/x.jpg".into(),
            note: Some("repot".into()),
        };
        let patch = RecordPatch {
            species: Some("Gymnocalycium baldianum".into()),
            ..Default::default()
        };
        record.apply(&patch);

        assert_eq!(record.species, "Gymnocalycium baldianum");
        assert_eq!(record.pot_number, "12");
        assert_eq!(record.note.as_deref(), Some("repot"));
    }

    #[test]
    fn test_is_blank_trims_whitespace() {
        assert!(Record::default().is_blank());
        let spaces = Record {
            date: "  ".into(),
            pot_number: " ".into(),
            note: Some("\t".into()),
            ..Default::default()
        };
        assert!(spaces.is_blank());
        assert!(!Record { pot_number: "1".into(), ..Default::default() }.is_blank());
        assert!(!Record { note: Some("memo".into()), ..Default::default() }.is_blank());
    }

    #[test]
    fn test_apply_patch_empty_note_clears() {
        let mut record = Record { note: Some("old".into()), ..Default::default() };
        record.apply(&RecordPatch { note: Some("  ".into()), ..Default::default() });
        assert_eq!(record.note, None);
    }

    #[test]
    fn test_from_extraction_drops_blank_note() {
        let record = Record::from_extraction(
            "id".into(),
            "2025-01-18".into(),
            Extraction { pot_number: "3".into(), ..Default::default() },
            "link".into(),
            Some(String::new()),
        );
        assert_eq!(record.pot_number, "3");
        assert_eq!(record.note, None);
    }
}
