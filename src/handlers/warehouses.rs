use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    barcode::{barcode_url, BarcodePayload},
    bins::{build_barcode_payload, parse_address, validate_selection, WarehouseDims},
    codes::{assign_code, EntityKind},
    error::{AppError, AppResult},
    models::{BinOccupancy, NewWarehouse, Warehouse},
    state::AppState,
};

use super::{required, JsonBody, Path, Query, SearchQuery};

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    name: Option<String>,
    location: Option<String>,
    #[serde(default, alias = "rowses", deserialize_with = "whole_number")]
    rows: Option<i64>,
    #[serde(default, alias = "racks", alias = "racksPerRow", deserialize_with = "whole_number")]
    racks_per_row: Option<i64>,
    #[serde(default, alias = "bins", alias = "binsPerRack", deserialize_with = "whole_number")]
    bins_per_rack: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

/// Form clients send dimensions as strings; `"4"` and `4` are the same value.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a whole number, got {text:?}"))),
    }
}

#[derive(Debug, Serialize)]
pub struct WarehouseCreated {
    pub warehouse: Warehouse,
}

#[derive(Debug, Deserialize)]
pub struct BinSelection {
    row: i64,
    rack: i64,
    bin: i64,
}

#[derive(Debug, Serialize)]
pub struct ResolvedBin {
    pub warehouse_id: i64,
    pub warehouse_code: String,
    pub row: u32,
    pub rack: u32,
    pub bin: u32,
    pub address: String,
    pub barcode_payload: String,
    pub barcode_url: String,
}

#[derive(Debug, Serialize)]
pub struct BinLayout {
    pub warehouse_id: i64,
    pub warehouse_code: String,
    pub rows: u32,
    pub racks_per_row: u32,
    pub bins_per_rack: u32,
    pub bin_count: u32,
    pub bin_capacity: Option<u32>,
    pub occupied: Vec<BinOccupancy>,
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateWarehouseRequest>,
) -> AppResult<(StatusCode, Json<WarehouseCreated>)> {
    let name = required(req.name, "name")?;
    let location = required(req.location, "location")?;
    let dims = WarehouseDims::new(req.rows, req.racks_per_row, req.bins_per_rack)?;

    let warehouse = state
        .store
        .create_warehouse(&NewWarehouse { name, location, dims })
        .await?;
    log::info!(
        "created warehouse {} ({} bins)",
        warehouse.code.as_deref().unwrap_or("-"),
        dims.bin_count()
    );

    // The row is committed; a barcode failure only leaves it for the next read to repair.
    let warehouse = ensure_barcode(&state, warehouse).await;

    Ok((
        StatusCode::CREATED,
        Json(WarehouseCreated {
            warehouse: present(&state, warehouse),
        }),
    ))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Warehouse>> {
    let warehouse = load_warehouse(&state, id).await?;
    let warehouse = ensure_barcode(&state, warehouse).await;
    Ok(Json(present(&state, warehouse)))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let warehouses = state
        .store
        .list_warehouses(query.q.as_deref())
        .await?
        .into_iter()
        .map(|w| present(&state, w))
        .collect();
    Ok(Json(warehouses))
}

pub async fn bin_layout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BinLayout>> {
    let warehouse = load_warehouse(&state, id).await?;
    let dims = warehouse.dims()?;
    let occupied = state.store.bin_occupancy(id).await?;

    Ok(Json(BinLayout {
        warehouse_id: warehouse.id,
        warehouse_code: code_of(&warehouse),
        rows: dims.rows(),
        racks_per_row: dims.racks_per_row(),
        bins_per_rack: dims.bins_per_rack(),
        bin_count: dims.bin_count(),
        bin_capacity: state.config.bin_capacity,
        occupied,
    }))
}

pub async fn resolve_bin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(selection): JsonBody<BinSelection>,
) -> AppResult<Json<ResolvedBin>> {
    let warehouse = load_warehouse(&state, id).await?;
    let address = validate_selection(&warehouse.dims()?, selection.row, selection.rack, selection.bin)?;
    let warehouse_code = code_of(&warehouse);

    Ok(Json(ResolvedBin {
        warehouse_id: warehouse.id,
        barcode_payload: build_barcode_payload(&warehouse_code, address.row, address.rack, address.bin),
        barcode_url: format!("/api/warehouses/{}/bins/{}/barcode", warehouse.id, address),
        address: address.to_string(),
        row: address.row,
        rack: address.rack,
        bin: address.bin,
        warehouse_code,
    }))
}

pub async fn bin_barcode(
    State(state): State<AppState>,
    Path((id, address)): Path<(i64, String)>,
) -> AppResult<impl IntoResponse> {
    let warehouse = load_warehouse(&state, id).await?;
    let parsed = parse_address(&address)?;
    let address = validate_selection(
        &warehouse.dims()?,
        parsed.row.into(),
        parsed.rack.into(),
        parsed.bin.into(),
    )?;

    let payload = BarcodePayload::Bin {
        warehouse_code: code_of(&warehouse),
        address,
    };
    let png = state.barcodes.fetch_or_generate(&payload).await?;
    Ok(super::barcodes::png_response(png))
}

/// Fetch a warehouse, filling in its code if an earlier create never got to
/// write it.
pub(crate) async fn load_warehouse(state: &AppState, id: i64) -> AppResult<Warehouse> {
    let warehouse = state
        .store
        .find_warehouse(id)
        .await?
        .ok_or_else(|| AppError::not_found("warehouse", id))?;

    if warehouse.code.is_some() {
        return Ok(warehouse);
    }

    let code = assign_code(EntityKind::Warehouse, warehouse.id);
    log::warn!("warehouse {} had no code, backfilling {}", warehouse.id, code);
    state.store.backfill_warehouse_code(warehouse.id, &code).await
}

fn code_of(warehouse: &Warehouse) -> String {
    warehouse
        .code
        .clone()
        .unwrap_or_else(|| assign_code(EntityKind::Warehouse, warehouse.id))
}

/// Make sure the warehouse barcode image exists and its URL is recorded.
/// Failures are logged and leave the warehouse as it was.
async fn ensure_barcode(state: &AppState, mut warehouse: Warehouse) -> Warehouse {
    let Some(code) = warehouse.code.clone() else {
        return warehouse;
    };
    let payload = BarcodePayload::Warehouse { code: code.clone() };
    let url = barcode_url(&code, None);

    let on_disk = match state.barcodes.exists(&payload).await {
        Ok(on_disk) => on_disk,
        Err(e) => {
            log::error!("cannot check barcode for {}: {}", code, e);
            return warehouse;
        }
    };
    if on_disk && warehouse.barcode_url.as_deref() == Some(url.as_str()) {
        return warehouse;
    }

    if !on_disk {
        if let Err(e) = state.barcodes.fetch_or_generate(&payload).await {
            log::error!("failed to generate barcode for {}: {}", code, e);
            return warehouse;
        }
    }

    match state.store.set_warehouse_barcode_url(warehouse.id, &url).await {
        Ok(()) => warehouse.barcode_url = Some(url),
        Err(e) => log::error!("failed to record barcode url for {}: {}", code, e),
    }
    warehouse
}

/// Stored barcode URLs are relative; hand clients absolute ones when a public
/// base URL is configured.
fn present(state: &AppState, mut warehouse: Warehouse) -> Warehouse {
    if let (Some(base), Some(url)) = (&state.config.public_base_url, &warehouse.barcode_url) {
        if url.starts_with('/') {
            warehouse.barcode_url = Some(format!("{base}{url}"));
        }
    }
    warehouse
}

