//! 画像取り込みモジュール
//!
//! - アップロード画像の読み込みとダイジェスト計算
//! - EXIF Orientation補正・幅の縮小・JPEG再エンコード
//! - フォルダ内の画像一覧

mod exif;

pub use exif::read_orientation;

use crate::error::{CactusError, Result};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

/// アップロードされた画像（元バイト列のまま）
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// SHA-256（同一画像の再解析判定に使用）
    pub digest: String,
}

impl Upload {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CactusError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::from_bytes(file_name, bytes))
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let digest = digest(&bytes);
        Self {
            file_name: file_name.into(),
            bytes,
            digest,
        }
    }
}

/// 送信・保存用に整えたJPEG
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// バイト列のSHA-256（16進）
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// 画像を補正してJPEGに再エンコード
///
/// 出力JPEGはEXIFを持たないため、2回目以降は回転しない。
pub fn prepare_image(bytes: &[u8], max_width: Option<u32>, quality: u8) -> Result<PreparedImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CactusError::ImageLoad(format!("画像形式の判定に失敗: {}", e)))?
        .decode()
        .map_err(|e| CactusError::ImageLoad(format!("デコード失敗: {}", e)))?;

    let img = match read_orientation(bytes) {
        Some(orientation) => apply_orientation(img, orientation),
        None => img,
    };
    let img = downsample(img, max_width);

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| CactusError::ImageLoad(format!("JPEGエンコード失敗: {}", e)))?;

    Ok(PreparedImage {
        bytes: buf,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// EXIF Orientation (1〜8) に従って正立させる
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// 幅が上限を超える場合のみ縦横比を保って縮小
fn downsample(img: DynamicImage, max_width: Option<u32>) -> DynamicImage {
    let Some(max_width) = max_width.filter(|w| *w > 0) else {
        return img;
    };
    if img.width() <= max_width {
        return img;
    }
    let height = (u64::from(img.height()) * u64::from(max_width) / u64::from(img.width())).max(1) as u32;
    img.resize_exact(max_width, height, FilterType::Lanczos3)
}

/// フォルダ直下の画像ファイル一覧（ファイル名順）
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(CactusError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}
