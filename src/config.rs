use crate::error::{CactusError, Result};
use cactus_common::RankPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_SHEET_ID: &str = "CACTUS_SHEET_ID";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// 台帳・画像の保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google Sheets + Cloud Storage
    #[default]
    Google,
    /// ローカルのxlsx + ディレクトリ
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub sheet_id: Option<String>,
    pub sheet_name: String,
    pub bucket_name: String,
    pub storage_host: String,
    /// OAuthアクセストークン（`gcloud auth print-access-token` の値）
    pub access_token: Option<String>,
    pub backend: Backend,
    pub local_dir: Option<PathBuf>,
    /// 先に試すモデル（順番通り）
    pub model_candidates: Vec<String>,
    pub rank_policy: RankPolicy,
    /// 解決済みモデルの有効期間（秒）
    pub model_cache_ttl_seconds: u64,
    pub max_image_width: u32,
    pub jpeg_quality: u8,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CactusError::Config("設定ディレクトリが見つかりません".into()))?;
        Ok(dir.join("cactus-collector"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_key: None,
            sheet_id: None,
            sheet_name: "Sheet1".into(),
            bucket_name: "cactus-free-storage-2025".into(),
            storage_host: "storage.googleapis.com".into(),
            access_token: None,
            backend: Backend::Google,
            local_dir: None,
            model_candidates: vec![
                "gemini-1.5-flash".into(),
                "gemini-1.5-flash-latest".into(),
                "gemini-2.0-flash".into(),
            ],
            rank_policy: RankPolicy::default(),
            model_cache_ttl_seconds: 1800,
            max_image_width: 1024,
            jpeg_quality: 85,
            timeout_seconds: 120,
        }
    }

    /// ローカル保存先（未設定ならデータディレクトリ配下）
    pub fn local_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.local_dir {
            return Ok(dir.clone());
        }
        let data = dirs::data_dir()
            .ok_or_else(|| CactusError::Config("データディレクトリが見つかりません".into()))?;
        Ok(data.join("cactus-collector"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        env_or(ENV_GEMINI_API_KEY, &self.api_key).ok_or(CactusError::MissingCredential("Gemini APIキー"))
    }

    pub fn get_sheet_id(&self) -> Result<String> {
        env_or(ENV_SHEET_ID, &self.sheet_id).ok_or(CactusError::MissingCredential("シートID"))
    }

    pub fn get_access_token(&self) -> Result<String> {
        env_or(ENV_ACCESS_TOKEN, &self.access_token)
            .ok_or(CactusError::MissingCredential("Googleアクセストークン"))
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }
}

fn env_or(name: &str, fallback: &Option<String>) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.clone().filter(|v| !v.trim().is_empty()))
}
