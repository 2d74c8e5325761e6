use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    barcode::BarcodePayload,
    bins::validate_selection,
    codes::parse_code,
    error::{AppError, AppResult},
    state::AppState,
};

use super::{warehouses::load_warehouse, Path};

/// `GET /api/barcodes/:payload`, where payload is `W7` or `W7-R2K3B4`
/// (optionally with a `.png` suffix).
pub async fn get_barcode(
    State(state): State<AppState>,
    Path(payload): Path<String>,
) -> AppResult<Response> {
    let text = payload.strip_suffix(".png").unwrap_or(&payload);
    let payload = BarcodePayload::parse(text)?;

    // Only issue images for warehouses and bins that exist.
    let warehouse_code = match &payload {
        BarcodePayload::Warehouse { code } => code,
        BarcodePayload::Bin { warehouse_code, .. } => warehouse_code,
    };
    let (_, warehouse_id) = parse_code(warehouse_code)?;
    let warehouse = load_warehouse(&state, warehouse_id).await?;
    if warehouse.code.as_deref() != Some(warehouse_code.as_str()) {
        return Err(AppError::not_found("warehouse", warehouse_code));
    }
    if let BarcodePayload::Bin { address, .. } = &payload {
        validate_selection(
            &warehouse.dims()?,
            address.row.into(),
            address.rack.into(),
            address.bin.into(),
        )?;
    }

    let png = state.barcodes.fetch_or_generate(&payload).await?;
    Ok(png_response(png))
}

pub(crate) fn png_response(png: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png"),
            // Same payload, same image.
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        png,
    )
        .into_response()
}
