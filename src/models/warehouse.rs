use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

use crate::bins::{BinError, WarehouseDims};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    pub id: i64,
    pub code: Option<String>,
    pub barcode_url: Option<String>,
    pub name: String,
    pub location: String,
    #[serde(rename = "rows")]
    pub row_count: i32,
    pub racks_per_row: i32,
    pub bins_per_rack: i32,
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    /// Grid dimensions. Rows written through this service always pass; an
    /// error here means the row was edited outside of it.
    pub fn dims(&self) -> Result<WarehouseDims, BinError> {
        WarehouseDims::new(
            Some(self.row_count.into()),
            Some(self.racks_per_row.into()),
            Some(self.bins_per_rack.into()),
        )
    }
}

#[derive(Debug, Clone)]
pub struct NewWarehouse {
    pub name: String,
    pub location: String,
    pub dims: WarehouseDims,
}

/// Number of assets recorded in one bin of a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BinOccupancy {
    pub address: String,
    pub asset_count: i64,
}
