//! 画像アップロードモジュール
//!
//! - GcsBucket: Google Cloud Storage（公開URLを返す）
//! - LocalBucket: ローカルディレクトリ（file:// URLを返す）

mod gcs;
mod local;

pub use gcs::GcsBucket;
pub use local::LocalBucket;

use crate::error::Result;
use async_trait::async_trait;
use cactus_common::LinkBase;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 画像を保存し、取得用URLを返す
    async fn upload(&self, file_name: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    /// 保存先の公開URL接頭辞（リンク修復に使用）
    fn link_base(&self) -> LinkBase;
}
