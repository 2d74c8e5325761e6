//! `PgStore` against a real database. Each test gets a fresh database with
//! the migrations applied (requires `DATABASE_URL`).

use sqlx::PgPool;

use stockbin::bins::{BinAddress, WarehouseDims};
use stockbin::error::AppError;
use stockbin::models::{NewAsset, NewWarehouse};
use stockbin::store::{InventoryStore, PgStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_warehouse(name: &str, rows: i64, racks: i64, bins: i64) -> NewWarehouse {
    NewWarehouse {
        name: name.to_string(),
        location: "Building 1".to_string(),
        dims: WarehouseDims::new(Some(rows), Some(racks), Some(bins)).unwrap(),
    }
}

fn new_asset(name: &str) -> NewAsset {
    NewAsset {
        name: name.to_string(),
        location: None,
        status: "available".to_string(),
        image_data: Some("data:image/png;base64,AAAA".to_string()),
    }
}

fn bin(row: u32, rack: u32, bin: u32) -> BinAddress {
    BinAddress { row, rack, bin }
}

/// Insert a warehouse the way an interrupted create would leave it.
async fn insert_codeless_warehouse(pool: &PgPool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO warehouses (name, location, row_count, racks_per_row, bins_per_rack)
         VALUES ('Legacy', 'Annex', 2, 3, 4) RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_stamps_codes_from_identifiers(pool: PgPool) {
    let store = PgStore::new(pool);

    let first = store.create_warehouse(&new_warehouse("North", 2, 3, 4)).await.unwrap();
    let second = store.create_warehouse(&new_warehouse("South", 1, 1, 1)).await.unwrap();
    assert_eq!(first.code, Some(format!("W{}", first.id)));
    assert_eq!(second.code, Some(format!("W{}", second.id)));
    assert_eq!((first.row_count, first.racks_per_row, first.bins_per_rack), (2, 3, 4));

    let asset = store.create_asset(&new_asset("Drill")).await.unwrap();
    assert_eq!(asset.code, Some(format!("A{}", asset.id)));

    let stored = store.find_warehouse(first.id).await.unwrap().unwrap();
    assert_eq!(stored.code, first.code);
}

#[sqlx::test(migrations = "./migrations")]
async fn backfill_writes_a_code_once(pool: PgPool) {
    let id = insert_codeless_warehouse(&pool).await;
    let store = PgStore::new(pool);

    assert_eq!(store.find_warehouse(id).await.unwrap().unwrap().code, None);

    let code = format!("W{id}");
    let filled = store.backfill_warehouse_code(id, &code).await.unwrap();
    assert_eq!(filled.code.as_deref(), Some(code.as_str()));

    // A second backfill leaves the stored code alone.
    let again = store.backfill_warehouse_code(id, "W999999").await.unwrap();
    assert_eq!(again.code.as_deref(), Some(code.as_str()));

    assert!(matches!(
        store.backfill_warehouse_code(id + 1000, "W1").await,
        Err(AppError::NotFound { .. })
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn codes_and_dimensions_are_frozen(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let warehouse = store.create_warehouse(&new_warehouse("North", 2, 3, 4)).await.unwrap();

    let resize = sqlx::query("UPDATE warehouses SET row_count = 3 WHERE id = $1")
        .bind(warehouse.id)
        .execute(&pool)
        .await;
    assert!(resize.is_err());

    let recode = sqlx::query("UPDATE warehouses SET code = 'W0' WHERE id = $1")
        .bind(warehouse.id)
        .execute(&pool)
        .await;
    assert!(recode.is_err());

    // Other columns stay writable.
    store
        .set_warehouse_barcode_url(warehouse.id, "/uploads/barcodes/W1.png")
        .await
        .unwrap();

    let stored = store.find_warehouse(warehouse.id).await.unwrap().unwrap();
    assert_eq!(stored.row_count, 2);
    assert_eq!(stored.code, warehouse.code);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn search_treats_wildcards_literally(pool: PgPool) {
    let store = PgStore::new(pool);
    store.create_asset(&new_asset("100% cotton rag")).await.unwrap();
    store.create_asset(&new_asset("cotton_rag")).await.unwrap();
    store.create_asset(&new_asset("Cotton rope")).await.unwrap();

    let percent = store.list_assets(Some("%")).await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].name, "100% cotton rag");

    let underscore = store.list_assets(Some("n_r")).await.unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].name, "cotton_rag");

    let all = store.list_assets(Some("  COTTON ")).await.unwrap();
    let names: Vec<&str> = all.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Cotton rope", "cotton_rag", "100% cotton rag"]);
    assert!(all.iter().all(|a| a.image_data.is_none()));
}

#[sqlx::test(migrations = "./migrations")]
async fn warehouse_search_covers_codes(pool: PgPool) {
    let store = PgStore::new(pool);
    let north = store.create_warehouse(&new_warehouse("North", 1, 1, 1)).await.unwrap();
    store.create_warehouse(&new_warehouse("South", 1, 1, 1)).await.unwrap();

    let code = north.code.clone().unwrap().to_lowercase();
    let found = store.list_warehouses(Some(&code)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, north.id);

    assert_eq!(store.list_warehouses(None).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Bin assignment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn bin_capacity_conflicts(pool: PgPool) {
    let store = PgStore::new(pool);
    let warehouse = store.create_warehouse(&new_warehouse("Main", 1, 1, 2)).await.unwrap();
    let drill = store.create_asset(&new_asset("Drill")).await.unwrap();
    let saw = store.create_asset(&new_asset("Saw")).await.unwrap();

    let placed = store
        .assign_asset_to_bin(drill.id, warehouse.id, &bin(1, 1, 1), Some(1))
        .await
        .unwrap();
    assert_eq!(placed.location.as_deref(), Some("R1K1B1"));
    assert_eq!(placed.warehouse_id, Some(warehouse.id));
    assert_eq!(placed.status, "warehouse");

    // Placing the same asset again does not count against the bin.
    store
        .assign_asset_to_bin(drill.id, warehouse.id, &bin(1, 1, 1), Some(1))
        .await
        .unwrap();

    assert!(matches!(
        store.assign_asset_to_bin(saw.id, warehouse.id, &bin(1, 1, 1), Some(1)).await,
        Err(AppError::Conflict(_))
    ));
    store
        .assign_asset_to_bin(saw.id, warehouse.id, &bin(1, 1, 1), None)
        .await
        .unwrap();

    assert!(matches!(
        store.assign_asset_to_bin(saw.id, warehouse.id + 100, &bin(1, 1, 1), None).await,
        Err(AppError::NotFound { .. })
    ));
    assert!(matches!(
        store.assign_asset_to_bin(saw.id + 100, warehouse.id, &bin(1, 1, 1), None).await,
        Err(AppError::NotFound { .. })
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_assignments_respect_capacity(pool: PgPool) {
    let store = PgStore::new(pool);
    let warehouse = store.create_warehouse(&new_warehouse("Main", 1, 1, 1)).await.unwrap();
    let drill = store.create_asset(&new_asset("Drill")).await.unwrap();
    let saw = store.create_asset(&new_asset("Saw")).await.unwrap();

    let address = bin(1, 1, 1);
    let (a, b) = tokio::join!(
        store.assign_asset_to_bin(drill.id, warehouse.id, &address, Some(1)),
        store.assign_asset_to_bin(saw.id, warehouse.id, &address, Some(1)),
    );

    let placed = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(placed, 1, "exactly one asset fits");

    let occupancy = store.bin_occupancy(warehouse.id).await.unwrap();
    assert_eq!(occupancy.len(), 1);
    assert_eq!(occupancy[0].asset_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn occupancy_is_in_address_order(pool: PgPool) {
    let store = PgStore::new(pool);
    let warehouse = store.create_warehouse(&new_warehouse("Main", 20, 1, 1)).await.unwrap();

    for (name, row) in [("A", 10), ("B", 2), ("C", 2)] {
        let asset = store.create_asset(&new_asset(name)).await.unwrap();
        store
            .assign_asset_to_bin(asset.id, warehouse.id, &bin(row, 1, 1), None)
            .await
            .unwrap();
    }

    let occupancy = store.bin_occupancy(warehouse.id).await.unwrap();
    let summary: Vec<(&str, i64)> = occupancy
        .iter()
        .map(|b| (b.address.as_str(), b.asset_count))
        .collect();
    assert_eq!(summary, [("R2K1B1", 2_i64), ("R10K1B1", 1_i64)]);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_is_a_conflict(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = store.create_user("ops@example.com", "$2b$04$hash").await.unwrap();

    assert!(matches!(
        store.create_user("ops@example.com", "$2b$04$other").await,
        Err(AppError::Conflict(_))
    ));

    let found = store.find_user_by_email("ops@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(store.find_user(user.id).await.unwrap().unwrap().email, "ops@example.com");
}
