//! Barcode images for warehouses and bins.
//!
//! Images are Code 128 PNGs stored on disk under the configured barcode
//! directory as `{payload}.png`. The image is a pure function of its payload,
//! so an existing file is never regenerated. Two requests racing on a missing
//! image both render it; each writes a private temp file and renames it into
//! place, and whichever rename lands last wins. Temp files live in a sibling
//! staging directory so the served directory only ever holds complete images.

use std::path::{Path, PathBuf};

use barcoders::generators::image::Image;
use barcoders::sym::code128::Code128;
use tokio::fs;
use uuid::Uuid;

use crate::bins::{parse_address, BinAddress};
use crate::codes::{parse_code, EntityKind};

pub const BARCODE_URL_PREFIX: &str = "/uploads/barcodes";

const IMAGE_HEIGHT: u32 = 80;

/// Code 128 character set B prefix understood by `barcoders`.
const CHARSET_B: char = 'Ɓ';

#[derive(Debug, thiserror::Error)]
pub enum BarcodeError {
    #[error("{0}")]
    InvalidPayload(String),

    #[error("failed to render barcode: {0}")]
    Render(String),

    #[error("barcode storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text that may be encoded in a barcode issued by this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodePayload {
    Warehouse { code: String },
    Bin { warehouse_code: String, address: BinAddress },
}

impl BarcodePayload {
    /// Accepts `W{id}` or `W{id}-R{row}K{rack}B{bin}`.
    pub fn parse(text: &str) -> Result<Self, BarcodeError> {
        let invalid = || {
            BarcodeError::InvalidPayload(format!(
                "'{text}' is not a warehouse code or warehouse bin label"
            ))
        };

        let (code, address) = match text.split_once('-') {
            Some((code, address)) => (code, Some(address)),
            None => (text, None),
        };

        match parse_code(code) {
            Ok((EntityKind::Warehouse, _)) => {}
            _ => return Err(invalid()),
        }

        match address {
            None => Ok(BarcodePayload::Warehouse {
                code: code.to_string(),
            }),
            Some(address) => Ok(BarcodePayload::Bin {
                warehouse_code: code.to_string(),
                address: parse_address(address).map_err(|_| invalid())?,
            }),
        }
    }

    pub fn text(&self) -> String {
        match self {
            BarcodePayload::Warehouse { code } => code.clone(),
            BarcodePayload::Bin {
                warehouse_code,
                address,
            } => format!("{warehouse_code}-{address}"),
        }
    }
}

/// Render `text` as a Code 128 PNG.
pub fn render_png(text: &str) -> Result<Vec<u8>, BarcodeError> {
    let symbol = Code128::new(format!("{CHARSET_B}{text}"))
        .map_err(|e| BarcodeError::Render(e.to_string()))?;
    let encoded = symbol.encode();

    Image::png(IMAGE_HEIGHT)
        .generate(&encoded[..])
        .map_err(|e| BarcodeError::Render(e.to_string()))
}

/// Public URL of a stored barcode image.
pub fn barcode_url(payload: &str, public_base_url: Option<&str>) -> String {
    format!(
        "{}{}/{}.png",
        public_base_url.unwrap_or(""),
        BARCODE_URL_PREFIX,
        urlencoding::encode(payload)
    )
}

#[derive(Debug, Clone)]
pub struct BarcodeStore {
    dir: PathBuf,
    staging: PathBuf,
}

impl BarcodeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let staging = staging_dir(&dir);
        Self { dir, staging }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub async fn init(&self) -> Result<(), BarcodeError> {
        fs::create_dir_all(&self.dir).await?;
        fs::create_dir_all(&self.staging).await?;
        Ok(())
    }

    fn path_for(&self, payload: &BarcodePayload) -> PathBuf {
        self.dir.join(format!("{}.png", payload.text()))
    }

    pub async fn exists(&self, payload: &BarcodePayload) -> Result<bool, BarcodeError> {
        Ok(fs::try_exists(self.path_for(payload)).await?)
    }

    /// Make sure the image for `payload` is on disk and return its bytes.
    pub async fn fetch_or_generate(&self, payload: &BarcodePayload) -> Result<Vec<u8>, BarcodeError> {
        let path = self.path_for(payload);

        match fs::read(&path).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let text = payload.text();
        let png = render_png(&text)?;

        self.init().await?;
        let tmp = self.staging.join(format!("{}.{}.tmp", text, Uuid::new_v4()));
        fs::write(&tmp, &png).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        log::info!("generated barcode {}", text);
        Ok(png)
    }
}

/// `public/uploads/barcodes` stages into `public/uploads/.barcodes-staging`,
/// on the same filesystem so the final rename stays atomic.
fn staging_dir(dir: &Path) -> PathBuf {
    match dir.file_name() {
        Some(name) => dir.with_file_name(format!(".{}-staging", name.to_string_lossy())),
        None => std::env::temp_dir().join("stockbin-barcode-staging"),
    }
}
