//! Domain service for the asset registry.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::Actor;
use crate::domain::schedule::DateFormatError;
use crate::entities::assets;
use crate::services::maintenance_service::LogView;
use crate::services::storage::FileStorage;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Validation(String),

    #[error("QR code not available for asset {0}")]
    QrUnavailable(i32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AssetError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<DateFormatError> for AssetError {
    fn from(err: DateFormatError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_end: Option<NaiveDate>,
    pub frequency_days: Option<i32>,
    pub assigned_user_id: Option<i32>,
    pub qr_code_path: Option<String>,
    pub qr_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AssetView {
    #[must_use]
    pub fn from_model(asset: assets::Model, storage: &FileStorage) -> Self {
        let qr_url = storage.qr_url(asset.qr_code_path.as_deref());
        Self {
            id: asset.id,
            name: asset.name,
            category: asset.category,
            location: asset.location,
            purchase_date: asset.purchase_date,
            warranty_end: asset.warranty_end,
            frequency_days: asset.frequency_days,
            assigned_user_id: asset.assigned_user_id,
            qr_code_path: asset.qr_code_path,
            qr_url,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetListing {
    pub items: Vec<AssetView>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AssetQuery {
    pub location: Option<String>,
    pub category: Option<String>,
    pub assigned_user: Option<i32>,
    pub page: u64,
    pub limit: u64,
}

/// Create payload. Dates are raw `YYYY-MM-DD` strings validated by the service.
#[derive(Debug, Clone, Default)]
pub struct AssetInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<String>,
    pub warranty_end: Option<String>,
    pub frequency_days: Option<i32>,
    pub assigned_user_id: Option<i32>,
}

/// Partial update. `Some(None)` clears a column; `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct AssetUpdate {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub purchase_date: Option<Option<String>>,
    pub warranty_end: Option<Option<String>>,
    pub frequency_days: Option<Option<i32>>,
    pub assigned_user_id: Option<Option<i32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetQr {
    pub asset_id: i32,
    pub qr_code_path: String,
    pub qr_url: Option<String>,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DueAsset {
    pub asset: AssetView,
    pub latest_log: LogView,
    pub overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetDeleted {
    pub id: i32,
    pub logs_deleted: u64,
}

/// Domain service trait for asset management.
#[async_trait::async_trait]
pub trait AssetService: Send + Sync {
    /// Paginated listing. TECH actors only see assets assigned to them.
    async fn list(&self, actor: &Actor, query: AssetQuery) -> Result<AssetListing, AssetError>;

    async fn get(&self, id: i32) -> Result<AssetView, AssetError>;

    /// Creates an asset and writes its QR image.
    async fn create(&self, actor: &Actor, input: AssetInput) -> Result<AssetView, AssetError>;

    /// Applies a partial update and rewrites the QR image.
    async fn update(&self, actor: &Actor, id: i32, update: AssetUpdate)
    -> Result<AssetView, AssetError>;

    /// Deletes the asset together with all of its maintenance logs.
    async fn delete(&self, actor: &Actor, id: i32) -> Result<AssetDeleted, AssetError>;

    /// QR details, regenerating the image when it is missing on disk.
    async fn qr(&self, id: i32) -> Result<AssetQr, AssetError>;

    /// File name of the stored QR image, for the public redirect.
    async fn qr_file(&self, id: i32) -> Result<String, AssetError>;

    async fn latest_log(&self, id: i32) -> Result<Option<LogView>, AssetError>;

    /// Assets whose most recent log is due today or earlier.
    async fn due(&self, actor: &Actor) -> Result<Vec<DueAsset>, AssetError>;
}
