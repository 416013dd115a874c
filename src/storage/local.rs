use super::BlobStore;
use crate::error::{CactusError, Result};
use async_trait::async_trait;
use cactus_common::LinkBase;
use std::path::PathBuf;

pub struct LocalBucket {
    dir: PathBuf,
}

impl LocalBucket {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl BlobStore for LocalBucket {
    async fn upload(&self, file_name: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CactusError::Upload(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)
            .map_err(|e| CactusError::Upload(format!("{}: {}", path.display(), e)))?;

        log::info!("ローカル保存: {}", path.display());
        Ok(self.link_base().url(file_name))
    }

    fn link_base(&self) -> LinkBase {
        LinkBase::from_prefix(format!("file://{}", self.dir.display()))
    }
}
