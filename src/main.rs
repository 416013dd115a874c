use cactus_collector::{app, cli, config, error, form, intake};
use cactus_collector::vision::cache::CacheFile;
use app::{unattended_fields, App, FieldOverrides};
use cactus_common::RecordPatch;
use clap::Parser;
use cli::{Cli, Commands};
use config::{Backend, Config};
use error::{CactusError, Result};
use intake::Upload;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = cli.local_dir {
        config.local_dir = Some(dir);
    }

    match cli.command {
        Commands::Add { image, pot, species, thai_name, note, yes, use_cache } => {
            println!("🌵 cactus - 登録\n");
            let mut app = build_app(config, use_cache)?;
            let overrides = FieldOverrides { pot, species, thai_name };
            add_photo(&mut app, &image, overrides, note, yes).await?;
        }

        Commands::Scan { folder, yes, use_cache } => {
            println!("🌵 cactus - 一括登録\n");
            let images = intake::scan_folder(&folder)?;
            if images.is_empty() {
                return Err(CactusError::NoImagesFound(folder.display().to_string()));
            }
            println!("✔ {}枚の写真を検出\n", images.len());

            // 1セッションで処理し、解決済みモデルを使い回す
            let mut app = build_app(config, use_cache)?;
            let mut saved = 0;
            for (i, path) in images.iter().enumerate() {
                println!("[{}/{}] {}", i + 1, images.len(), path.display());
                match add_photo(&mut app, path, FieldOverrides::default(), None, yes).await {
                    Ok(true) => saved += 1,
                    Ok(false) => {}
                    Err(e) => println!("❌ {}\n", e),
                }
            }
            println!("\n✅ {}/{}枚を登録", saved, images.len());
        }

        Commands::Analyze { image } => {
            // 台帳・画像保存は使わないので資格情報不要のローカル構成で組む
            config.backend = Backend::Local;
            let mut app = App::from_config(config)?;
            let upload = Upload::open(&image)?;

            let pb = form::spinner("AI解析中...");
            let outcome = app.analyze(&upload).await;
            pb.finish_and_clear();

            // 失敗時はエラーとして終了コードを非0にする
            let extraction = outcome?.into_result()?;
            println!("{}", serde_json::to_string_pretty(&extraction)?);
        }

        Commands::List { json } => {
            let app = App::from_config(config)?;
            let records = app.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("📋 {} ({}件)\n", app.describe_table(), records.len());
                form::print_records(&records);
            }
        }

        Commands::Edit { id, pot, species, thai_name, image_link, note } => {
            let app = App::from_config(config)?;
            let mut patch = RecordPatch {
                pot_number: pot,
                species,
                thai_name,
                image_link,
                note,
                ..Default::default()
            };

            if patch.is_empty() {
                let record = app
                    .find(&id)
                    .await?
                    .ok_or_else(|| CactusError::RecordNotFound(id.clone()))?;
                patch = form::edit_record(&record)?;
            }

            if patch.is_empty() {
                println!("変更はありません");
                return Ok(());
            }

            let updated = app.edit(&id, &patch).await?;
            println!("✔ 更新しました: #{} {}", updated.pot_number, updated.species);
        }

        Commands::Delete { id, yes } => {
            let app = App::from_config(config)?;
            let record = app
                .find(&id)
                .await?
                .ok_or_else(|| CactusError::RecordNotFound(id.clone()))?;

            println!("#{} {} / {} ({})", record.pot_number, record.species, record.thai_name, record.date);
            if !yes && !form::confirm("このレコードを削除しますか?", false)? {
                println!("中止しました");
                return Ok(());
            }

            app.delete(&id).await?;
            println!("✔ 削除しました: {}", id);
        }

        Commands::Repair { dry_run } => {
            let app = App::from_config(config)?;
            let actions = app.repair(dry_run).await?;

            if actions.is_empty() {
                println!("✓ 修復が必要な行はありません");
                return Ok(());
            }

            for a in &actions {
                println!("行 {} (#{})", a.index + 1, a.pot_number);
                if let Some(ref link) = a.new_link {
                    println!("  リンク: {}", a.old_link);
                    println!("       → {}", link);
                }
                if let Some(ref id) = a.new_id {
                    println!("  ID付与: {}", id);
                }
            }

            if dry_run {
                println!("\n(ドライラン: {}件は未適用)", actions.len());
            } else {
                println!("\n✔ {}件を修復しました", actions.len());
            }
        }

        Commands::Models { resolve } => {
            config.backend = Backend::Local;
            let mut app = App::from_config(config)?;

            let (statics, live) = app.model_candidates().await;
            println!("設定の候補:");
            for m in &statics {
                println!("  {}", m);
            }
            println!("一覧APIの候補（優先順）:");
            for m in &live {
                println!("  {}", m);
            }

            if resolve {
                let pb = form::spinner("モデルを確認中...");
                let result = app.resolve_model().await;
                pb.finish_and_clear();
                println!("\n✔ 使用モデル: {}", result?);
            }
        }

        Commands::Config { set_api_key, set_sheet_id, set_access_token, show } => {
            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }
            if let Some(id) = set_sheet_id {
                config.sheet_id = Some(id);
                config.save()?;
                println!("✔ シートIDを設定しました");
            }
            if let Some(token) = set_access_token {
                config.access_token = Some(token);
                config.save()?;
                println!("✔ アクセストークンを設定しました");
            }

            if show {
                let set = |v: bool| if v { "設定済み" } else { "未設定" };
                println!("設定: {}", Config::config_path()?.display());
                println!("  保存先: {:?}", config.backend);
                println!("  シート名: {}", config.sheet_name);
                println!("  バケット: {}", config.bucket_name);
                println!("  モデル候補: {}", config.model_candidates.join(", "));
                println!("  モデルキャッシュ: {}秒", config.model_cache_ttl_seconds);
                println!("  最大画像幅: {}px", config.max_image_width);
                println!("  APIキー: {}", set(config.get_api_key().is_ok()));
                println!("  シートID: {}", set(config.get_sheet_id().is_ok()));
                println!("  アクセストークン: {}", set(config.get_access_token().is_ok()));
            }
        }

        Commands::Cache { clear } => {
            let dir = Config::config_dir()?;
            let cache_path = CacheFile::cache_path(&dir);

            if clear {
                match CacheFile::clear(&dir) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            } else {
                let cache = CacheFile::load(&dir);
                println!("キャッシュ情報:");
                println!("  パス: {}", cache_path.display());
                println!("  件数: {}", cache.len());
            }
        }
    }

    Ok(())
}

fn build_app(config: Config, use_cache: bool) -> Result<App> {
    let app = App::from_config(config)?;
    if use_cache {
        Ok(app.with_cache(Config::config_dir()?))
    } else {
        Ok(app)
    }
}

/// 1枚登録。保存したら true、中止したら false
async fn add_photo(
    app: &mut App,
    image: &Path,
    overrides: FieldOverrides,
    note: Option<String>,
    yes: bool,
) -> Result<bool> {
    let upload = Upload::open(image)?;

    let pb = form::spinner("AIが鉢ラベルと品種を読み取り中...");
    let outcome = app.analyze(&upload).await;
    pb.finish_and_clear();
    let outcome = outcome?;
    form::render_outcome(&outcome);

    let (fields, note) = if yes {
        match unattended_fields(&outcome, overrides) {
            Some(fields) => (fields, note),
            None => {
                println!("⏭ 入力値がないためスキップしました: {}\n", upload.file_name);
                return Ok(false);
            }
        }
    } else {
        let mut fields = outcome.fields();
        overrides.apply(&mut fields);
        println!();
        form::edit_fields(&fields, note.as_deref())?
    };

    let same_pot = app.find_pot(&fields.pot_number).await?;
    if !same_pot.is_empty() {
        println!("⚠ 鉢番号 {} は既に{}件登録されています", fields.pot_number, same_pot.len());
    }

    if !yes && !form::confirm("画像をアップロードして保存しますか?", true)? {
        println!("中止しました\n");
        return Ok(false);
    }

    let pb = form::spinner("画像をアップロードして保存中...");
    let saved = app.save(&upload, fields, note).await;
    pb.finish_and_clear();
    let record = saved?;

    println!("✅ 鉢番号 {} を保存しました", record.pot_number);
    println!("  ID: {}", record.id);
    println!("  画像: {}\n", record.image_link);
    Ok(true)
}
