use async_trait::async_trait;

use super::{like_pattern, normalize_search, InventoryStore};
use crate::{
    bins::BinAddress,
    codes::{assign_code, EntityKind},
    database::Database,
    error::{AppError, AppResult},
    models::{Asset, BinOccupancy, NewAsset, NewWarehouse, User, Warehouse, STATUS_IN_WAREHOUSE},
};

const WAREHOUSE_COLUMNS: &str =
    "id, code, barcode_url, name, location, row_count, racks_per_row, bins_per_rack, created_at";

const ASSET_COLUMNS: &str =
    "id, code, name, location, warehouse_id, status, image_data, created_at";

// Lists never ship the image blob.
const ASSET_LIST_COLUMNS: &str =
    "id, code, name, location, warehouse_id, status, NULL::text AS image_data, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Database,
}

impl PgStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn create_warehouse(&self, new: &NewWarehouse) -> AppResult<Warehouse> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO warehouses (name, location, row_count, racks_per_row, bins_per_rack)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(&new.location)
        .bind(new.dims.rows() as i32)
        .bind(new.dims.racks_per_row() as i32)
        .bind(new.dims.bins_per_rack() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "UPDATE warehouses SET code = $1 WHERE id = $2 RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(assign_code(EntityKind::Warehouse, id))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(warehouse)
    }

    async fn find_warehouse(&self, id: i64) -> AppResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(warehouse)
    }

    async fn list_warehouses(&self, search: Option<&str>) -> AppResult<Vec<Warehouse>> {
        let warehouses = match normalize_search(search) {
            Some(term) => {
                sqlx::query_as::<_, Warehouse>(&format!(
                    r#"
                    SELECT {WAREHOUSE_COLUMNS} FROM warehouses
                    WHERE name ILIKE $1 OR location ILIKE $1 OR code ILIKE $1
                    ORDER BY created_at DESC, id DESC
                    "#
                ))
                .bind(like_pattern(term))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Warehouse>(&format!(
                    "SELECT {WAREHOUSE_COLUMNS} FROM warehouses ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(warehouses)
    }

    async fn backfill_warehouse_code(&self, id: i64, code: &str) -> AppResult<Warehouse> {
        sqlx::query("UPDATE warehouses SET code = $1 WHERE id = $2 AND code IS NULL")
            .bind(code)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.find_warehouse(id)
            .await?
            .ok_or_else(|| AppError::not_found("warehouse", id))
    }

    async fn set_warehouse_barcode_url(&self, id: i64, url: &str) -> AppResult<()> {
        sqlx::query("UPDATE warehouses SET barcode_url = $1 WHERE id = $2")
            .bind(url)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn bin_occupancy(&self, warehouse_id: i64) -> AppResult<Vec<BinOccupancy>> {
        let mut bins = sqlx::query_as::<_, BinOccupancy>(
            r#"
            SELECT location AS address, COUNT(*) AS asset_count
            FROM assets
            WHERE warehouse_id = $1 AND location IS NOT NULL
            GROUP BY location
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        // Text order would put R10 before R2.
        bins.sort_by_key(|b| b.address.parse::<BinAddress>().ok());
        Ok(bins)
    }

    async fn create_asset(&self, new: &NewAsset) -> AppResult<Asset> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO assets (name, location, status, image_data)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(&new.location)
        .bind(&new.status)
        .bind(&new.image_data)
        .fetch_one(&mut *tx)
        .await?;

        let asset = sqlx::query_as::<_, Asset>(&format!(
            "UPDATE assets SET code = $1 WHERE id = $2 RETURNING {ASSET_COLUMNS}"
        ))
        .bind(assign_code(EntityKind::Asset, id))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(asset)
    }

    async fn find_asset(&self, id: i64) -> AppResult<Option<Asset>> {
        let asset = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(asset)
    }

    async fn list_assets(&self, search: Option<&str>) -> AppResult<Vec<Asset>> {
        let assets = match normalize_search(search) {
            Some(term) => {
                sqlx::query_as::<_, Asset>(&format!(
                    r#"
                    SELECT {ASSET_LIST_COLUMNS} FROM assets
                    WHERE name ILIKE $1 OR location ILIKE $1 OR code ILIKE $1
                    ORDER BY created_at DESC, id DESC
                    "#
                ))
                .bind(like_pattern(term))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Asset>(&format!(
                    "SELECT {ASSET_LIST_COLUMNS} FROM assets ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(assets)
    }

    async fn backfill_asset_code(&self, id: i64, code: &str) -> AppResult<Asset> {
        sqlx::query("UPDATE assets SET code = $1 WHERE id = $2 AND code IS NULL")
            .bind(code)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.find_asset(id)
            .await?
            .ok_or_else(|| AppError::not_found("asset", id))
    }

    async fn assign_asset_to_bin(
        &self,
        asset_id: i64,
        warehouse_id: i64,
        address: &BinAddress,
        capacity: Option<u32>,
    ) -> AppResult<Asset> {
        let address = address.to_string();
        let mut tx = self.pool.begin().await?;

        // Row lock on the warehouse serializes assignments into its bins.
        sqlx::query_scalar::<_, i64>("SELECT id FROM warehouses WHERE id = $1 FOR UPDATE")
            .bind(warehouse_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("warehouse", warehouse_id))?;

        if let Some(capacity) = capacity {
            let occupants: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM assets WHERE warehouse_id = $1 AND location = $2 AND id <> $3",
            )
            .bind(warehouse_id)
            .bind(&address)
            .bind(asset_id)
            .fetch_one(&mut *tx)
            .await?;

            if occupants >= i64::from(capacity) {
                return Err(AppError::Conflict(format!(
                    "bin {address} already holds {occupants} asset(s)"
                )));
            }
        }

        let asset = sqlx::query_as::<_, Asset>(&format!(
            r#"
            UPDATE assets SET location = $1, warehouse_id = $2, status = $3
            WHERE id = $4
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(&address)
        .bind(warehouse_id)
        .bind(STATUS_IN_WAREHOUSE)
        .bind(asset_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("asset", asset_id))?;

        tx.commit().await?;
        Ok(asset)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
