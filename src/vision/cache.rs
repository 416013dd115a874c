//! 解析結果キャッシュモジュール
//!
//! 画像のSHA-256をキーにして解析結果をキャッシュし、
//! 同じ画像の再解析をスキップする。

use crate::error::Result;
use cactus_common::Extraction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = "extraction-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 画像ダイジェスト → 解析結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub model: String,
    pub extraction: Extraction,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(dir: &Path) -> PathBuf {
        dir.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（なし・破損・版違いは空）
    pub fn load(dir: &Path) -> Self {
        let cache_path = Self::cache_path(dir);
        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                log::warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                log::warn!("キャッシュ読み込み失敗: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let file = File::create(Self::cache_path(dir))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（存在しなければ false）
    pub fn clear(dir: &Path) -> Result<bool> {
        let path = Self::cache_path(dir);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    pub fn get(&self, digest: &str) -> Option<&Extraction> {
        self.entries.get(digest).map(|e| &e.extraction)
    }

    pub fn insert(&mut self, digest: String, file_name: String, model: String, extraction: Extraction) {
        self.entries.insert(
            digest,
            CacheEntry {
                file_name,
                model,
                extraction,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}
