use super::BlobStore;
use crate::error::{CactusError, Result};
use crate::http::ensure_success;
use async_trait::async_trait;
use cactus_common::LinkBase;

const GCS_UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1/b";

pub struct GcsBucket {
    client: reqwest::Client,
    token: String,
    bucket: String,
    host: String,
}

impl GcsBucket {
    pub fn new(client: reqwest::Client, token: String, bucket: String, host: String) -> Self {
        Self {
            client,
            token,
            bucket,
            host,
        }
    }
}

#[async_trait]
impl BlobStore for GcsBucket {
    async fn upload(&self, file_name: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let url = format!("{}/{}/o", GCS_UPLOAD_BASE, self.bucket);
        let resp = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", file_name)])
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| CactusError::Upload(e.to_string()))?;
        ensure_success(resp).await.map_err(CactusError::Upload)?;

        let link = self.link_base().url(file_name);
        log::info!("アップロード完了: {} ({} bytes)", link, bytes.len());
        Ok(link)
    }

    fn link_base(&self) -> LinkBase {
        LinkBase::new(&self.host, &self.bucket)
    }
}
