//! 処理フローテスト
//!
//! 偽のAIバックエンドとローカル台帳・保存先で
//! 解析 → 保存、アップロード失敗時の中断、リンク修復を検証

use async_trait::async_trait;
use cactus_collector::app::{unattended_fields, App, FieldOverrides};
use cactus_collector::config::Config;
use cactus_collector::error::{CactusError, Result};
use cactus_collector::intake::{PreparedImage, Upload};
use cactus_collector::session::ExtractionOutcome;
use cactus_collector::sheet::{LocalSheet, TableStore};
use cactus_collector::storage::{BlobStore, LocalBucket};
use cactus_collector::vision::VisionBackend;
use cactus_common::link::find_blob_file_name;
use cactus_common::{Extraction, LinkBase, ModelInfo, Record, RecordPatch};
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

const REPLY: &str = "```json\n{\"pot_number\": \"12\", \"species\": \"Astrophytum asterias\", \"thai_name\": \"แอสโตร\"}\n```";

/// 疎通確認は常に成功し、画像つきの呼び出し回数を数える
struct FakeVision {
    image_calls: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl VisionBackend for FakeVision {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }

    async fn generate(&self, _model: &str, _prompt: &str, image: Option<&PreparedImage>) -> Result<String> {
        if image.is_none() {
            return Ok("hi".to_string());
        }
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(CactusError::ApiCall("429 quota exceeded".to_string()))
        } else {
            Ok(REPLY.to_string())
        }
    }
}

struct BrokenBucket;

#[async_trait]
impl BlobStore for BrokenBucket {
    async fn upload(&self, _: &str, _: &[u8], _: &str) -> Result<String> {
        Err(CactusError::Upload("403 Forbidden".to_string()))
    }

    fn link_base(&self) -> LinkBase {
        LinkBase::new("storage.googleapis.com", "bucket")
    }
}

fn config() -> Config {
    Config {
        model_candidates: vec!["fake-flash".to_string()],
        ..Default::default()
    }
}

fn photo(seed: u8) -> Upload {
    let img = RgbImage::from_fn(8, 6, |x, y| Rgb([seed, (x * 20) as u8, (y * 30) as u8]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    Upload::from_bytes(format!("photo_{}.png", seed), buf.into_inner())
}

fn local_app(dir: &Path, fail: bool) -> (App, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let vision = FakeVision {
        image_calls: calls.clone(),
        fail,
    };
    let app = App::new(
        config(),
        Box::new(vision),
        Box::new(LocalSheet::in_dir(dir, "Sheet1".to_string())),
        Box::new(LocalBucket::new(dir.join("blobs"))),
    );
    (app, calls)
}

/// 解析 → 保存で台帳に1行、画像が1枚残る
#[tokio::test]
async fn test_analyze_and_save() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (mut app, _) = local_app(dir.path(), false);
    let upload = photo(1);

    let outcome = app.analyze(&upload).await.unwrap();
    let fields = match outcome {
        ExtractionOutcome::Extracted(e) => e,
        ExtractionOutcome::Failed(reason) => panic!("解析失敗: {}", reason),
    };
    assert_eq!(fields.pot_number, "12");
    assert_eq!(fields.thai_name, "แอสโตร");

    let record = app.save(&upload, fields, Some("実生".to_string())).await.unwrap();
    assert!(record.has_id());
    assert_eq!(record.date.len(), 10);
    assert_eq!(record.note.as_deref(), Some("実生"));

    let file_name = find_blob_file_name(&record.image_link).expect("リンクにファイル名がない");
    assert!(file_name.starts_with("Cactus_12_"));
    assert!(dir.path().join("blobs").join(file_name).exists());

    let listed = app.list().await.unwrap();
    assert_eq!(listed, vec![record]);
    assert_eq!(app.session.generation(), 1);
}

/// 同じ画像は1回しか解析しない。保存後は解析し直す
#[tokio::test]
async fn test_analyze_once_per_upload() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (mut app, calls) = local_app(dir.path(), false);
    let upload = photo(2);

    let first = app.analyze(&upload).await.unwrap();
    let second = app.analyze(&upload).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    app.analyze(&photo(3)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    app.save(&upload, first.fields(), None).await.unwrap();
    app.analyze(&upload).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// AIが失敗しても空欄で続行でき、手入力の値で保存できる
#[tokio::test]
async fn test_failed_analysis_falls_back_to_empty_form() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (mut app, calls) = local_app(dir.path(), true);
    let upload = photo(4);

    let outcome = app.analyze(&upload).await.unwrap();
    match &outcome {
        ExtractionOutcome::Failed(reason) => assert!(reason.contains("429")),
        other => panic!("失敗として扱われない: {:?}", other),
    }
    assert!(outcome.fields().is_empty());
    // 失敗時は1回だけ再試行
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let typed = Extraction {
        pot_number: "99".to_string(),
        species: "Lophophora williamsii".to_string(),
        thai_name: String::new(),
    };
    let record = app.save(&upload, typed, None).await.unwrap();
    assert_eq!(record.pot_number, "99");
    assert_eq!(app.list().await.unwrap().len(), 1);
}

/// アップロード失敗時は台帳に書かない
#[tokio::test]
async fn test_upload_failure_skips_append() {
    let dir = tempdir().expect("Failed to create temp dir");
    let calls = Arc::new(AtomicUsize::new(0));
    let sheet = LocalSheet::in_dir(dir.path(), "Sheet1".to_string());
    let mut app = App::new(
        config(),
        Box::new(FakeVision {
            image_calls: calls,
            fail: false,
        }),
        Box::new(LocalSheet::in_dir(dir.path(), "Sheet1".to_string())),
        Box::new(BrokenBucket),
    );

    let upload = photo(5);
    let fields = app.analyze(&upload).await.unwrap().fields();
    let result = app.save(&upload, fields, None).await;

    assert!(matches!(result, Err(CactusError::Upload(_))));
    assert!(sheet.load().await.unwrap().is_empty());
    assert_eq!(app.session.generation(), 0);
    // 解析結果は残っているので再試行で再解析しない
    assert!(app.session.current().is_some());
}

/// 編集・削除はIDで対象を決める
#[tokio::test]
async fn test_edit_and_delete_by_id() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (mut app, _) = local_app(dir.path(), false);

    let a = photo(6);
    let fields = app.analyze(&a).await.unwrap().fields();
    let first = app.save(&a, fields, None).await.unwrap();

    let b = photo(7);
    let fields = app.analyze(&b).await.unwrap().fields();
    let second = app.save(&b, fields, None).await.unwrap();

    let patch = RecordPatch {
        pot_number: Some("13".to_string()),
        ..Default::default()
    };
    let edited = app.edit(&second.id, &patch).await.unwrap();
    assert_eq!(edited.pot_number, "13");
    assert_eq!(edited.image_link, second.image_link);

    assert_eq!(app.find_pot("12").await.unwrap(), vec![first.clone()]);

    app.delete(&first.id).await.unwrap();
    assert_eq!(app.list().await.unwrap(), vec![edited]);
    assert!(app.find(&first.id).await.unwrap().is_none());
}

/// 壊れたリンクの修復とIDの補完
#[tokio::test]
async fn test_repair_links_and_backfill_ids() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (app, _) = local_app(dir.path(), false);
    let sheet = LocalSheet::in_dir(dir.path(), "Sheet1".to_string());
    let base = LocalBucket::new(dir.path().join("blobs")).link_base();

    let canonical = base.url("Cactus_1_20250118_101010.jpg");
    let healthy = Record {
        id: "keep".to_string(),
        pot_number: "1".to_string(),
        image_link: canonical.clone(),
        ..Default::default()
    };
    let broken = Record {
        id: "fix".to_string(),
        pot_number: "2".to_string(),
        image_link: "=HYPERLINK(\"Cactus_2_20250118_111111.jpg\")".to_string(),
        ..Default::default()
    };
    let legacy = Record {
        id: String::new(),
        pot_number: "3".to_string(),
        image_link: "no file here".to_string(),
        ..Default::default()
    };
    for r in [&healthy, &broken, &legacy] {
        sheet.append(r).await.unwrap();
    }

    let preview = app.repair(true).await.unwrap();
    assert_eq!(preview.len(), 2);
    assert_eq!(sheet.load().await.unwrap()[1], broken);

    let actions = app.repair(false).await.unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].index, 1);
    assert_eq!(
        actions[0].new_link.as_deref(),
        Some(base.url("Cactus_2_20250118_111111.jpg").as_str())
    );
    assert!(actions[0].new_id.is_none());
    assert_eq!(actions[1].index, 2);
    assert!(actions[1].new_link.is_none());

    let loaded = sheet.load().await.unwrap();
    assert_eq!(loaded[0], healthy);
    assert_eq!(loaded[1].image_link, base.url("Cactus_2_20250118_111111.jpg"));
    assert_eq!(Some(&loaded[2].id), actions[1].new_id.as_ref());
    assert_eq!(loaded[2].image_link, "no file here");

    // 2回目は何もしない
    assert!(app.repair(false).await.unwrap().is_empty());
}

/// 空白だけの途中行はIDを付けず、位置もずらさない
#[tokio::test]
async fn test_repair_skips_whitespace_rows() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (app, _) = local_app(dir.path(), false);
    let sheet = LocalSheet::in_dir(dir.path(), "Sheet1".to_string());

    let spaces = Record {
        date: "  ".to_string(),
        pot_number: " ".to_string(),
        ..Default::default()
    };
    let legacy = Record {
        pot_number: "4".to_string(),
        ..Default::default()
    };
    sheet.append(&spaces).await.unwrap();
    sheet.append(&legacy).await.unwrap();

    let actions = app.repair(false).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].index, 1);

    let loaded = sheet.load().await.unwrap();
    assert!(loaded[0].is_blank());
    assert!(!loaded[0].has_id());
    assert!(loaded[1].has_id());
}

/// 確認なし保存: 解析失敗で入力値がなければ保存しない
#[tokio::test]
async fn test_unattended_save_skips_failed_analysis() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (mut app, _) = local_app(dir.path(), true);
    let upload = photo(8);

    let outcome = app.analyze(&upload).await.unwrap();
    assert!(outcome.is_failed());
    assert_eq!(unattended_fields(&outcome, FieldOverrides::default()), None);

    // 上書き指定があればその値で保存できる
    let overrides = FieldOverrides {
        pot: Some("21".to_string()),
        ..Default::default()
    };
    let fields = unattended_fields(&outcome, overrides).expect("上書き値がある");
    assert_eq!(fields.pot_number, "21");
    assert!(fields.species.is_empty());

    assert!(app.list().await.unwrap().is_empty());
    assert!(!dir.path().join("blobs").exists());
}

/// 確認なし保存: 解析結果はそのまま使う
#[tokio::test]
async fn test_unattended_save_accepts_extraction() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (mut app, _) = local_app(dir.path(), false);
    let upload = photo(9);

    let outcome = app.analyze(&upload).await.unwrap();
    let overrides = FieldOverrides {
        thai_name: Some("ดาวหาง".to_string()),
        ..Default::default()
    };
    let fields = unattended_fields(&outcome, overrides).expect("解析結果がある");
    assert_eq!(fields.pot_number, "12");
    assert_eq!(fields.thai_name, "ดาวหาง");
}
