use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{normalize_search, InventoryStore};
use crate::{
    bins::BinAddress,
    codes::{assign_code, EntityKind},
    error::{AppError, AppResult},
    models::{Asset, BinOccupancy, NewAsset, NewWarehouse, User, Warehouse, STATUS_IN_WAREHOUSE},
};

/// Process-local store. Every operation runs under one mutex, which gives the
/// same atomicity the Postgres store gets from transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    warehouses: BTreeMap<i64, Warehouse>,
    assets: BTreeMap<i64, Asset>,
    users: BTreeMap<i64, User>,
    last_warehouse_id: i64,
    last_asset_id: i64,
    last_user_id: i64,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    /// Insert a warehouse row exactly as given, e.g. one left without a code
    /// by an interrupted create. Later inserts get identifiers above it.
    pub fn insert_raw_warehouse(&self, warehouse: Warehouse) -> AppResult<()> {
        let mut t = self.tables()?;
        t.last_warehouse_id = t.last_warehouse_id.max(warehouse.id);
        t.warehouses.insert(warehouse.id, warehouse);
        Ok(())
    }

    /// Asset counterpart of [`MemoryStore::insert_raw_warehouse`].
    pub fn insert_raw_asset(&self, asset: Asset) -> AppResult<()> {
        let mut t = self.tables()?;
        t.last_asset_id = t.last_asset_id.max(asset.id);
        t.assets.insert(asset.id, asset);
        Ok(())
    }

    /// Number of mutations applied through the [`InventoryStore`] interface.
    pub fn writes(&self) -> AppResult<u64> {
        Ok(self.tables()?.writes)
    }
}

fn matches_search(term: &str, fields: &[Option<&str>]) -> bool {
    let term = term.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, i64),
{
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn create_warehouse(&self, new: &NewWarehouse) -> AppResult<Warehouse> {
        let mut t = self.tables()?;
        t.last_warehouse_id += 1;
        let id = t.last_warehouse_id;

        let warehouse = Warehouse {
            id,
            code: Some(assign_code(EntityKind::Warehouse, id)),
            barcode_url: None,
            name: new.name.clone(),
            location: new.location.clone(),
            row_count: new.dims.rows() as i32,
            racks_per_row: new.dims.racks_per_row() as i32,
            bins_per_rack: new.dims.bins_per_rack() as i32,
            created_at: Utc::now(),
        };
        t.warehouses.insert(id, warehouse.clone());
        t.writes += 1;
        Ok(warehouse)
    }

    async fn find_warehouse(&self, id: i64) -> AppResult<Option<Warehouse>> {
        Ok(self.tables()?.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>> {
        let t = self.tables()?;
        let rows: Vec<Warehouse> = t
            .warehouses
            .values()
            .filter(|w| match normalize_search(search) {
                Some(term) => matches_search(
                    term,
                    &[Some(w.name.as_str()), Some(w.location.as_str()), w.code.as_deref()],
                ),
                None => true,
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |w| (w.created_at, w.id)))
    }

    async fn backfill_warehouse_code(&self, id: i64, code: &str) -> AppResult<Warehouse> {
        let mut t = self.tables()?;
        let warehouse = t
            .warehouses
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("warehouse", id))?;

        if warehouse.code.is_some() {
            return Ok(warehouse.clone());
        }
        warehouse.code = Some(code.to_string());
        let warehouse = warehouse.clone();
        t.writes += 1;
        Ok(warehouse)
    }

    async fn set_warehouse_barcode_url(&self, id: i64, url: &str) -> AppResult<()> {
        let mut t = self.tables()?;
        let warehouse = t
            .warehouses
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("warehouse", id))?;
        warehouse.barcode_url = Some(url.to_string());
        t.writes += 1;
        Ok(())
    }

    async fn bin_occupancy(&self, warehouse_id: i64) -> AppResult<Vec<BinOccupancy>> {
        let t = self.tables()?;
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for asset in t.assets.values() {
            if asset.warehouse_id != Some(warehouse_id) {
                continue;
            }
            if let Some(location) = &asset.location {
                *counts.entry(location.clone()).or_default() += 1;
            }
        }

        let mut bins: Vec<BinOccupancy> = counts
            .into_iter()
            .map(|(address, asset_count)| BinOccupancy { address, asset_count })
            .collect();
        bins.sort_by_key(|b| b.address.parse::<BinAddress>().ok());
        Ok(bins)
    }

    async fn create_asset(&self, new: &NewAsset) -> AppResult<Asset> {
        let mut t = self.tables()?;
        t.last_asset_id += 1;
        let id = t.last_asset_id;

        let asset = Asset {
            id,
            code: Some(assign_code(EntityKind::Asset, id)),
            name: new.name.clone(),
            location: new.location.clone(),
            warehouse_id: None,
            status: new.status.clone(),
            image_data: new.image_data.clone(),
            created_at: Utc::now(),
        };
        t.assets.insert(id, asset.clone());
        t.writes += 1;
        Ok(asset)
    }

    async fn find_asset(&self, id: i64) -> AppResult<Option<Asset>> {
        Ok(self.tables()?.assets.get(&id).cloned())
    }

    async fn list_assets(&self, search: Option<&str>) -> AppResult<Vec<Asset>> {
        let t = self.tables()?;
        let rows: Vec<Asset> = t
            .assets
            .values()
            .filter(|a| match normalize_search(search) {
                Some(term) => matches_search(
                    term,
                    &[Some(a.name.as_str()), a.location.as_deref(), a.code.as_deref()],
                ),
                None => true,
            })
            .map(|a| Asset {
                image_data: None,
                ..a.clone()
            })
            .collect();
        Ok(newest_first(rows, |a| (a.created_at, a.id)))
    }

    async fn backfill_asset_code(&self, id: i64, code: &str) -> AppResult<Asset> {
        let mut t = self.tables()?;
        let asset = t
            .assets
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("asset", id))?;

        if asset.code.is_some() {
            return Ok(asset.clone());
        }
        asset.code = Some(code.to_string());
        let asset = asset.clone();
        t.writes += 1;
        Ok(asset)
    }

    async fn assign_asset_to_bin(
        &self,
        asset_id: i64,
        warehouse_id: i64,
        address: &BinAddress,
        capacity: Option<u32>,
    ) -> AppResult<Asset> {
        let mut t = self.tables()?;
        if !t.warehouses.contains_key(&warehouse_id) {
            return Err(AppError::not_found("warehouse", warehouse_id));
        }
        if !t.assets.contains_key(&asset_id) {
            return Err(AppError::not_found("asset", asset_id));
        }

        let address = address.to_string();
        if let Some(capacity) = capacity {
            let occupants = t
                .assets
                .values()
                .filter(|a| {
                    a.id != asset_id
                        && a.warehouse_id == Some(warehouse_id)
                        && a.location.as_deref() == Some(address.as_str())
                })
                .count();
            if occupants >= capacity as usize {
                return Err(AppError::Conflict(format!(
                    "bin {address} already holds {occupants} asset(s)"
                )));
            }
        }

        let asset = t
            .assets
            .get_mut(&asset_id)
            .ok_or_else(|| AppError::not_found("asset", asset_id))?;
        asset.location = Some(address);
        asset.warehouse_id = Some(warehouse_id);
        asset.status = STATUS_IN_WAREHOUSE.to_string();
        let asset = asset.clone();
        t.writes += 1;
        Ok(asset)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<User> {
        let mut t = self.tables()?;
        if t.users.values().any(|u| u.email == email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        t.last_user_id += 1;
        let user = User {
            id: t.last_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        t.writes += 1;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.tables()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }
}
