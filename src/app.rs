//! 処理の流れ
//!
//! 取り込み → 解析 → (フォーム編集) → アップロード → 台帳追加
//! と、台帳の一覧・編集・削除・リンク修復をまとめる。

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::http::build_client;
use crate::intake::{prepare_image, PreparedImage, Upload};
use crate::session::{ExtractionOutcome, Session};
use crate::sheet::{GoogleSheet, LocalSheet, TableStore};
use crate::storage::{BlobStore, GcsBucket, LocalBucket};
use crate::vision::cache::CacheFile;
use crate::vision::{self, GeminiClient, ModelResolver, VisionBackend};
use cactus_common::{blob_file_name, repair_image_link, Extraction, Record, RecordPatch};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;

/// リンク修復・ID補完の1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairAction {
    pub index: usize,
    pub pot_number: String,
    pub new_id: Option<String>,
    pub old_link: String,
    pub new_link: Option<String>,
}

/// 登録時に解析結果を上書きする項目
#[derive(Debug, Clone, Default)]
pub struct FieldOverrides {
    pub pot: Option<String>,
    pub species: Option<String>,
    pub thai_name: Option<String>,
}

impl FieldOverrides {
    pub fn apply(self, fields: &mut Extraction) {
        if let Some(v) = self.pot {
            fields.pot_number = v;
        }
        if let Some(v) = self.species {
            fields.species = v;
        }
        if let Some(v) = self.thai_name {
            fields.thai_name = v;
        }
    }
}

/// 確認なしで保存する値
///
/// フォームで補う機会がないため、全項目が空なら None（保存しない）。
pub fn unattended_fields(outcome: &ExtractionOutcome, overrides: FieldOverrides) -> Option<Extraction> {
    let mut fields = outcome.fields();
    overrides.apply(&mut fields);
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

pub struct App {
    config: Config,
    vision: Box<dyn VisionBackend>,
    table: Box<dyn TableStore>,
    blobs: Box<dyn BlobStore>,
    cache_dir: Option<PathBuf>,
    pub session: Session,
}

impl App {
    pub fn new(
        config: Config,
        vision: Box<dyn VisionBackend>,
        table: Box<dyn TableStore>,
        blobs: Box<dyn BlobStore>,
    ) -> Self {
        let session = Session::new(ModelResolver::from_config(&config));
        Self {
            config,
            vision,
            table,
            blobs,
            cache_dir: None,
            session,
        }
    }

    /// 設定からバックエンドを組み立てる（資格情報がなければエラー）
    pub fn from_config(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let vision = GeminiClient::new(config.get_api_key()?, timeout)?;

        let (table, blobs): (Box<dyn TableStore>, Box<dyn BlobStore>) = match config.backend {
            Backend::Google => {
                let token = config.get_access_token()?;
                let sheet_id = config.get_sheet_id()?;
                let client = build_client(timeout)?;
                (
                    Box::new(GoogleSheet::new(
                        client.clone(),
                        token.clone(),
                        sheet_id,
                        config.sheet_name.clone(),
                    )),
                    Box::new(GcsBucket::new(
                        client,
                        token,
                        config.bucket_name.clone(),
                        config.storage_host.clone(),
                    )),
                )
            }
            Backend::Local => {
                let dir = config.local_dir()?;
                (
                    Box::new(LocalSheet::in_dir(&dir, config.sheet_name.clone())),
                    Box::new(LocalBucket::new(dir.join(&config.bucket_name))),
                )
            }
        };

        log::debug!("backend: {:?} / 台帳: {}", config.backend, table.describe());
        Ok(Self::new(config, Box::new(vision), table, blobs))
    }

    /// 解析結果キャッシュを有効にする
    pub fn with_cache(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn describe_table(&self) -> String {
        self.table.describe()
    }

    fn prepare(&self, upload: &Upload) -> Result<PreparedImage> {
        prepare_image(
            &upload.bytes,
            Some(self.config.max_image_width),
            self.config.jpeg_quality,
        )
    }

    /// 画像を解析（同じ画像は再解析しない）
    ///
    /// 画像自体が読めない場合のみエラー。AI側の失敗は `Failed` として返す。
    pub async fn analyze(&mut self, upload: &Upload) -> Result<ExtractionOutcome> {
        if !self.session.needs_analysis(upload) {
            if let Some(outcome) = self.session.current() {
                log::debug!("解析済みの画像: {}", upload.file_name);
                return Ok(outcome.clone());
            }
        }

        let prepared = self.prepare(upload)?;

        let mut cache = self.cache_dir.as_deref().map(CacheFile::load);
        if let Some(hit) = cache.as_ref().and_then(|c| c.get(&upload.digest)) {
            log::info!("キャッシュから解析結果を取得: {}", upload.file_name);
            let outcome = ExtractionOutcome::Extracted(hit.clone());
            self.session.record_analysis(upload, outcome.clone());
            return Ok(outcome);
        }

        let outcome =
            match vision::extract(self.vision.as_ref(), &mut self.session.resolver, &prepared).await {
                Ok(extraction) => {
                    if let (Some(cache), Some(dir)) = (cache.as_mut(), self.cache_dir.as_deref()) {
                        let model = self.session.resolver.cached().unwrap_or_default().to_string();
                        cache.insert(
                            upload.digest.clone(),
                            upload.file_name.clone(),
                            model,
                            extraction.clone(),
                        );
                        if let Err(e) = cache.save(dir) {
                            log::warn!("キャッシュ保存失敗: {}", e);
                        }
                    }
                    ExtractionOutcome::Extracted(extraction)
                }
                Err(e) => {
                    log::warn!("解析失敗 {}: {}", upload.file_name, e);
                    ExtractionOutcome::Failed(e.to_string())
                }
            };

        self.session.record_analysis(upload, outcome.clone());
        Ok(outcome)
    }

    /// 画像をアップロードして台帳に追加
    ///
    /// アップロードに失敗した場合は台帳に書かずにエラーを返す。
    pub async fn save(
        &mut self,
        upload: &Upload,
        fields: Extraction,
        note: Option<String>,
    ) -> Result<Record> {
        let prepared = self.prepare(upload)?;

        let now = Local::now();
        let file_name = blob_file_name(&fields.pot_number, &now.format("%Y%m%d_%H%M%S").to_string());
        let link = self
            .blobs
            .upload(&file_name, &prepared.bytes, PreparedImage::MIME_TYPE)
            .await?;

        let record = Record::from_extraction(
            uuid::Uuid::new_v4().to_string(),
            now.date_naive().format("%Y-%m-%d").to_string(),
            fields,
            link,
            note,
        );
        self.table.append(&record).await?;

        self.session.finish_save();
        Ok(record)
    }

    pub async fn list(&self) -> Result<Vec<Record>> {
        self.table.load().await
    }

    /// 同じ鉢番号の既存レコード（重複は許可、警告用）
    pub async fn find_pot(&self, pot_number: &str) -> Result<Vec<Record>> {
        let pot_number = pot_number.trim();
        if pot_number.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .table
            .load()
            .await?
            .into_iter()
            .filter(|r| r.pot_number.trim() == pot_number)
            .collect())
    }

    pub async fn find(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.table.load().await?.into_iter().find(|r| r.has_id() && r.id == id))
    }

    pub async fn edit(&self, id: &str, patch: &RecordPatch) -> Result<Record> {
        self.table.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<Record> {
        self.table.delete(id).await
    }

    /// 壊れた画像リンクの修復とIDの補完
    pub async fn repair(&self, dry_run: bool) -> Result<Vec<RepairAction>> {
        let base = self.blobs.link_base();
        let records = self.table.load().await?;
        let mut actions = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if record.is_blank() {
                continue;
            }

            let new_link = repair_image_link(&record.image_link, &base);
            let new_id = if record.has_id() {
                None
            } else {
                Some(uuid::Uuid::new_v4().to_string())
            };
            if new_link.is_none() && new_id.is_none() {
                continue;
            }

            if !dry_run {
                let mut updated = record.clone();
                updated.apply(&RecordPatch {
                    id: new_id.clone(),
                    image_link: new_link.clone(),
                    ..Default::default()
                });
                // 読み込み直後の位置に書き戻す
                self.table.overwrite(index, &updated).await?;
            }

            actions.push(RepairAction {
                index,
                pot_number: record.pot_number.clone(),
                new_id,
                old_link: record.image_link.clone(),
                new_link,
            });
        }

        Ok(actions)
    }

    /// 設定の候補と一覧APIの候補（優先順）
    pub async fn model_candidates(&self) -> (Vec<String>, Vec<String>) {
        let resolver = &self.session.resolver;
        (
            resolver.static_candidates(),
            resolver.live_candidates(self.vision.as_ref()).await,
        )
    }

    pub async fn resolve_model(&mut self) -> Result<String> {
        self.session.resolver.resolve(self.vision.as_ref()).await
    }
}
