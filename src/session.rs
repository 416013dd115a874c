//! セッション状態
//!
//! 1回の起動中に持ち回る状態をまとめる:
//! - 解決済みモデル（ModelResolver内、有効期限つき）
//! - 最後に解析した画像のダイジェストと解析結果
//! - 保存ごとに進むアップロード世代

use crate::error::{CactusError, Result};
use crate::intake::Upload;
use crate::vision::ModelResolver;
use cactus_common::Extraction;

/// 解析の結果（エラーはデータ項目に混ぜず別に持つ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Extracted(Extraction),
    Failed(String),
}

impl ExtractionOutcome {
    /// フォームの初期値（失敗時は空欄）
    pub fn fields(&self) -> Extraction {
        match self {
            ExtractionOutcome::Extracted(e) => e.clone(),
            ExtractionOutcome::Failed(_) => Extraction::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExtractionOutcome::Failed(_))
    }

    /// 失敗を `ExtractionFailed` エラーに変換
    pub fn into_result(self) -> Result<Extraction> {
        match self {
            ExtractionOutcome::Extracted(e) => Ok(e),
            ExtractionOutcome::Failed(reason) => Err(CactusError::ExtractionFailed(reason)),
        }
    }
}

#[derive(Debug, Clone)]
struct AnalyzedUpload {
    digest: String,
    outcome: ExtractionOutcome,
}

#[derive(Debug)]
pub struct Session {
    pub resolver: ModelResolver,
    last: Option<AnalyzedUpload>,
    generation: u64,
}

impl Session {
    pub fn new(resolver: ModelResolver) -> Self {
        Self {
            resolver,
            last: None,
            generation: 0,
        }
    }

    /// 直前と異なる画像なら解析が必要
    pub fn needs_analysis(&self, upload: &Upload) -> bool {
        self.last
            .as_ref()
            .map(|a| a.digest != upload.digest)
            .unwrap_or(true)
    }

    pub fn record_analysis(&mut self, upload: &Upload, outcome: ExtractionOutcome) {
        self.last = Some(AnalyzedUpload {
            digest: upload.digest.clone(),
            outcome,
        });
    }

    /// 直前の解析結果
    pub fn current(&self) -> Option<&ExtractionOutcome> {
        self.last.as_ref().map(|a| &a.outcome)
    }

    /// 保存完了: 一時状態を消してアップロード世代を進める
    pub fn finish_save(&mut self) {
        self.last = None;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
