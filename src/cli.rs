use crate::config::Backend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cactus")]
#[command(about = "サボテン写真AI解析・コレクション台帳ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 保存先 (google/local)。省略時は設定ファイルの値
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// ローカル保存先ディレクトリ（--backend local 用）
    #[arg(long, global = true)]
    pub local_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真を解析して台帳に登録
    Add {
        /// 写真ファイル
        #[arg(required = true)]
        image: PathBuf,

        /// 鉢番号（解析結果を上書き）
        #[arg(long)]
        pot: Option<String>,

        /// 学名（解析結果を上書き）
        #[arg(long)]
        species: Option<String>,

        /// タイ語名（解析結果を上書き）
        #[arg(long)]
        thai_name: Option<String>,

        /// 備考
        #[arg(short, long)]
        note: Option<String>,

        /// 確認せずに保存
        #[arg(short, long)]
        yes: bool,

        /// 解析結果キャッシュを使用
        #[arg(long)]
        use_cache: bool,
    },

    /// フォルダ内の写真をまとめて登録
    Scan {
        /// 写真フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 確認せずに保存
        #[arg(short, long)]
        yes: bool,

        /// 解析結果キャッシュを使用
        #[arg(long)]
        use_cache: bool,
    },

    /// 写真を解析して結果をJSONで表示（保存しない）
    Analyze {
        /// 写真ファイル
        #[arg(required = true)]
        image: PathBuf,
    },

    /// 台帳を一覧表示
    List {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 台帳の1行を編集（項目指定なしなら対話式）
    Edit {
        /// レコードID
        #[arg(required = true)]
        id: String,

        #[arg(long)]
        pot: Option<String>,

        #[arg(long)]
        species: Option<String>,

        #[arg(long)]
        thai_name: Option<String>,

        #[arg(long)]
        image_link: Option<String>,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// 台帳の1行を削除
    Delete {
        /// レコードID
        #[arg(required = true)]
        id: String,

        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },

    /// 壊れた画像リンクを修復し、IDのない行にIDを付ける
    Repair {
        /// ドライラン（変更を適用せずプレビュー）
        #[arg(long)]
        dry_run: bool,
    },

    /// モデル候補を表示
    Models {
        /// 実際に疎通確認して使用モデルを決定
        #[arg(long)]
        resolve: bool,
    },

    /// 設定を表示/編集
    Config {
        /// Gemini APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// スプレッドシートIDを設定
        #[arg(long)]
        set_sheet_id: Option<String>,

        /// Googleアクセストークンを設定
        #[arg(long)]
        set_access_token: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// 解析結果キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,
    },
}
