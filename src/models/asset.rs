use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

pub const STATUS_AVAILABLE: &str = "available";
/// Set once the asset has been placed in a warehouse bin.
pub const STATUS_IN_WAREHOUSE: &str = "warehouse";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub location: Option<String>,
    pub warehouse_id: Option<i64>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub name: String,
    pub location: Option<String>,
    pub status: String,
    pub image_data: Option<String>,
}
