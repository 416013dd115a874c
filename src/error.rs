use thiserror::Error;

#[derive(Error, Debug)]
pub enum CactusError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("{0} が設定されていません。`cactus config` または環境変数で設定してください")]
    MissingCredential(&'static str),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("AI解析できませんでした: {0}")]
    ExtractionFailed(String),

    #[error("利用可能なモデルが見つかりません（{tried}件試行）")]
    NoWorkingModel { tried: usize },

    #[error("アップロードエラー: {0}")]
    Upload(String),

    #[error("台帳エラー: {0}")]
    Sheet(String),

    #[error("レコードが見つかりません: {0}")]
    RecordNotFound(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cactus_common::Error),
}

pub type Result<T> = std::result::Result<T, CactusError>;
