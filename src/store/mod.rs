//! Persistence for warehouses, assets and users.
//!
//! Handlers talk to an [`InventoryStore`]; production uses [`PgStore`], the
//! test suite uses [`MemoryStore`]. Both assign identifiers themselves and
//! write the derived display code in the same atomic step as the insert.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::bins::BinAddress;
use crate::error::AppResult;
use crate::models::{Asset, BinOccupancy, NewAsset, NewWarehouse, User, Warehouse};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert a warehouse and stamp its `W{id}` code before the insert becomes
    /// visible.
    async fn create_warehouse(&self, new: &NewWarehouse) -> AppResult<Warehouse>;

    async fn find_warehouse(&self, id: i64) -> AppResult<Option<Warehouse>>;

    /// Newest first. `search` matches name, location or code, case-insensitively.
    async fn list_warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>>;

    /// Write `code` onto a warehouse that has none yet and return the stored
    /// row. A code that is already set is left untouched.
    async fn backfill_warehouse_code(&self, id: i64, code: &str) -> AppResult<Warehouse>;

    async fn set_warehouse_barcode_url(&self, id: i64, url: &str) -> AppResult<()>;

    /// Occupied bins of a warehouse, in address order.
    async fn bin_occupancy(&self, warehouse_id: i64) -> AppResult<Vec<BinOccupancy>>;

    /// Insert an asset and stamp its `A{id}` code before the insert becomes
    /// visible.
    async fn create_asset(&self, new: &NewAsset) -> AppResult<Asset>;

    async fn find_asset(&self, id: i64) -> AppResult<Option<Asset>>;

    /// Newest first, without image data.
    async fn list_assets(&self, search: Option<&str>) -> AppResult<Vec<Asset>>;

    async fn backfill_asset_code(&self, id: i64, code: &str) -> AppResult<Asset>;

    /// Record `address` as the asset's location inside `warehouse_id` and mark
    /// it as stored. With a `capacity`, fails with `Conflict` when the bin
    /// already holds that many other assets; the check and the write are
    /// serialized per warehouse.
    async fn assign_asset_to_bin(
        &self,
        asset_id: i64,
        warehouse_id: i64,
        address: &BinAddress,
        capacity: Option<u32>,
    ) -> AppResult<Asset>;

    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<User>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;
}

/// Trimmed search term, or `None` when there is nothing to search for.
pub fn normalize_search(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in the term
/// taken literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
