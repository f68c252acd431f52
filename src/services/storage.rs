//! Uploaded attachments and generated QR images on local disk.
//!
//! Files are addressed by bare name only. Every name coming from a request is
//! run through [`sanitize_filename`] and must come back unchanged, so it can
//! never address anything outside its directory.

use chrono::Utc;
use qrcode::QrCode;
use qrcode::render::svg;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::StorageConfig;

/// File types the public QR endpoint will serve.
pub const QR_SERVE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg", "pdf"];

const UPLOAD_PREFIX: &str = "file";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file or extension not allowed")]
    ExtensionNotAllowed,

    #[error("Invalid file name")]
    InvalidName,

    #[error("File not found")]
    NotFound,

    #[error("Failed to encode QR code: {0}")]
    Qr(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn unsafe_chars_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("Invalid regex"))
}

/// Reduces a client-supplied name to `[A-Za-z0-9_.-]`, dropping any directory part.
///
/// Whitespace runs become `_`; leading and trailing `.`/`_` are stripped.
/// Returns an empty string when nothing usable remains.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = unsafe_chars_regex().replace_all(&joined, "");
    cleaned.trim_matches(['.', '_']).to_string()
}

/// Lower-case extension of a file name, if any.
#[must_use]
pub fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn has_extension_in<S: AsRef<str>>(name: &str, allowed: &[S]) -> bool {
    extension(name).is_some_and(|ext| allowed.iter().any(|a| a.as_ref() == ext))
}

/// Validates a requested file name: sanitizing must not change it and its
/// extension must be in `allowed`.
pub fn checked_filename<S: AsRef<str>>(requested: &str, allowed: &[S]) -> Result<String, StorageError> {
    let cleaned = sanitize_filename(requested);
    if cleaned.is_empty() || cleaned != requested {
        return Err(StorageError::InvalidName);
    }
    if !has_extension_in(&cleaned, allowed) {
        return Err(StorageError::InvalidName);
    }
    Ok(cleaned)
}

/// Deterministic QR image name for an asset.
#[must_use]
pub fn qr_filename(asset_id: i32) -> String {
    format!("asset_{asset_id}.svg")
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_dir: PathBuf,
    qr_dir: PathBuf,
    allowed_upload_extensions: Vec<String>,
    qr_scheme: String,
    base_url: String,
}

impl FileStorage {
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            qr_dir: PathBuf::from(&config.qr_dir),
            allowed_upload_extensions: config
                .allowed_upload_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            qr_scheme: config.qr_scheme.clone(),
            base_url: config.base_url().to_string(),
        }
    }

    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.qr_dir).await?;
        Ok(())
    }

    /// Deep link encoded in an asset's QR image.
    #[must_use]
    pub fn qr_payload(&self, asset_id: i32) -> String {
        format!("{}://asset/{asset_id}", self.qr_scheme)
    }

    /// Absolute (or host-relative when no base URL is configured) link to a QR file.
    #[must_use]
    pub fn qr_url(&self, qr_path: Option<&str>) -> Option<String> {
        let name = Path::new(qr_path?).file_name()?.to_str()?;
        Some(format!("{}/api/qr/{name}", self.base_url))
    }

    /// Stores an uploaded attachment as `file_<UTC timestamp>_<sanitized name>`.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if !has_extension_in(original_name, &self.allowed_upload_extensions) {
            return Err(StorageError::ExtensionNotAllowed);
        }

        let cleaned = sanitize_filename(original_name);
        if cleaned.is_empty() || !has_extension_in(&cleaned, &self.allowed_upload_extensions) {
            return Err(StorageError::ExtensionNotAllowed);
        }

        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let filename = format!("{UPLOAD_PREFIX}_{stamp}_{cleaned}");
        tokio::fs::write(self.upload_dir.join(&filename), bytes).await?;

        info!(file = %filename, size = bytes.len(), "Stored upload");
        Ok(filename)
    }

    /// Path of an existing upload.
    pub async fn resolve_upload(&self, requested: &str) -> Result<PathBuf, StorageError> {
        let name = checked_filename(requested, &self.allowed_upload_extensions)?;
        existing(self.upload_dir.join(name)).await
    }

    /// Path of an existing QR image. The QR directory is tried before the upload directory.
    pub async fn resolve_qr(&self, requested: &str) -> Result<PathBuf, StorageError> {
        let name = checked_filename(requested, QR_SERVE_EXTENSIONS)?;

        for dir in [&self.qr_dir, &self.upload_dir] {
            if let Ok(path) = existing(dir.join(&name)).await {
                return Ok(path);
            }
        }
        Err(StorageError::NotFound)
    }

    /// Writes `asset_<id>.svg` and returns its file name.
    pub async fn write_qr(&self, asset_id: i32) -> Result<String, StorageError> {
        let code = QrCode::new(self.qr_payload(asset_id).as_bytes())
            .map_err(|e| StorageError::Qr(e.to_string()))?;

        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(240, 240)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        tokio::fs::create_dir_all(&self.qr_dir).await?;
        let filename = qr_filename(asset_id);
        tokio::fs::write(self.qr_dir.join(&filename), image).await?;

        debug!(asset_id, file = %filename, "QR image written");
        Ok(filename)
    }

    pub async fn qr_exists(&self, filename: &str) -> bool {
        self.resolve_qr(filename).await.is_ok()
    }
}

async fn existing(path: PathBuf) -> Result<PathBuf, StorageError> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(StorageError::NotFound),
    }
}
