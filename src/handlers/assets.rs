use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    bins::{build_barcode_payload, validate_selection},
    codes::{assign_code, EntityKind},
    error::{AppError, AppResult},
    models::{Asset, NewAsset, STATUS_AVAILABLE},
    state::AppState,
};

use super::{optional, required, warehouses::load_warehouse, JsonBody, Path, Query, SearchQuery};

#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    #[serde(alias = "assetname")]
    name: Option<String>,
    /// Usually a bin address, but stored as given.
    #[serde(alias = "location_id")]
    location: Option<String>,
    status: Option<String>,
    image_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetCreated {
    pub asset: Asset,
}

#[derive(Debug, Deserialize)]
pub struct AssignLocationRequest {
    warehouse_id: i64,
    row: i64,
    rack: i64,
    bin: i64,
}

#[derive(Debug, Serialize)]
pub struct AssetAssigned {
    pub asset: Asset,
    pub barcode_payload: String,
}

pub async fn create_asset(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateAssetRequest>,
) -> AppResult<(StatusCode, Json<AssetCreated>)> {
    let new = NewAsset {
        name: required(req.name, "name")?,
        location: optional(req.location),
        status: optional(req.status).unwrap_or_else(|| STATUS_AVAILABLE.to_string()),
        image_data: req.image_data.filter(|data| !data.is_empty()),
    };

    let asset = state.store.create_asset(&new).await?;
    log::info!("created asset {}", asset.code.as_deref().unwrap_or("-"));

    Ok((StatusCode::CREATED, Json(AssetCreated { asset })))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Asset>> {
    let asset = state
        .store
        .find_asset(id)
        .await?
        .ok_or_else(|| AppError::not_found("asset", id))?;

    if asset.code.is_some() {
        return Ok(Json(asset));
    }

    let code = assign_code(EntityKind::Asset, asset.id);
    log::warn!("asset {} had no code, backfilling {}", asset.id, code);
    let asset = state.store.backfill_asset_code(asset.id, &code).await?;
    Ok(Json(asset))
}

pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Asset>>> {
    let assets = state.store.list_assets(query.q.as_deref()).await?;
    Ok(Json(assets))
}

/// Place an asset in a warehouse bin. The selection is checked against the
/// warehouse grid before anything is written.
pub async fn assign_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<AssignLocationRequest>,
) -> AppResult<Json<AssetAssigned>> {
    let warehouse = load_warehouse(&state, req.warehouse_id).await?;
    let address = validate_selection(&warehouse.dims()?, req.row, req.rack, req.bin)?;

    let asset = state
        .store
        .assign_asset_to_bin(id, warehouse.id, &address, state.config.bin_capacity)
        .await?;

    let warehouse_code = warehouse
        .code
        .unwrap_or_else(|| assign_code(EntityKind::Warehouse, warehouse.id));
    log::info!(
        "asset {} placed in {}-{}",
        asset.code.as_deref().unwrap_or("-"),
        warehouse_code,
        address
    );

    Ok(Json(AssetAssigned {
        barcode_payload: build_barcode_payload(&warehouse_code, address.row, address.rack, address.bin),
        asset,
    }))
}
