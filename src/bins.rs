//! Bin addressing inside a warehouse grid.
//!
//! A warehouse declares how many rows it has, how many racks stand in each
//! row and how many bins each rack holds. A bin is addressed by its 1-based
//! `(row, rack, bin)` position and written as `R{row}K{rack}B{bin}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_ROWS: i64 = 20;
pub const MAX_RACKS_PER_ROW: i64 = 20;
pub const MAX_BINS_PER_RACK: i64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinError {
    #[error("invalid warehouse dimensions: {0}")]
    InvalidDimensions(String),

    #[error("malformed bin address '{0}', expected R<row>K<rack>B<bin>")]
    MalformedAddress(String),

    #[error(
        "bin R{row}K{rack}B{bin} is outside the {rows}x{racks_per_row}x{bins_per_rack} grid"
    )]
    OutOfRange {
        row: i64,
        rack: i64,
        bin: i64,
        rows: u32,
        racks_per_row: u32,
        bins_per_rack: u32,
    },
}

/// Grid size of a warehouse. Only constructible through [`WarehouseDims::new`],
/// so every value in circulation respects the ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarehouseDims {
    rows: u32,
    racks_per_row: u32,
    bins_per_rack: u32,
}

impl WarehouseDims {
    pub fn new(
        rows: Option<i64>,
        racks_per_row: Option<i64>,
        bins_per_rack: Option<i64>,
    ) -> Result<Self, BinError> {
        Ok(Self {
            rows: check_dimension("rows", rows, MAX_ROWS)?,
            racks_per_row: check_dimension("racks_per_row", racks_per_row, MAX_RACKS_PER_ROW)?,
            bins_per_rack: check_dimension("bins_per_rack", bins_per_rack, MAX_BINS_PER_RACK)?,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn racks_per_row(&self) -> u32 {
        self.racks_per_row
    }

    pub fn bins_per_rack(&self) -> u32 {
        self.bins_per_rack
    }

    pub fn bin_count(&self) -> u32 {
        self.rows * self.racks_per_row * self.bins_per_rack
    }

    pub fn contains(&self, address: &BinAddress) -> bool {
        (1..=self.rows).contains(&address.row)
            && (1..=self.racks_per_row).contains(&address.rack)
            && (1..=self.bins_per_rack).contains(&address.bin)
    }

    /// Every bin of the grid, row-major: rows, then racks, then bins.
    pub fn grid(&self) -> impl Iterator<Item = BinAddress> {
        let Self {
            rows,
            racks_per_row,
            bins_per_rack,
        } = *self;
        (1..=rows).flat_map(move |row| {
            (1..=racks_per_row).flat_map(move |rack| {
                (1..=bins_per_rack).map(move |bin| BinAddress { row, rack, bin })
            })
        })
    }
}

fn check_dimension(name: &str, value: Option<i64>, max: i64) -> Result<u32, BinError> {
    let value = value.ok_or_else(|| BinError::InvalidDimensions(format!("{name} is required")))?;
    if value < 1 || value > max {
        return Err(BinError::InvalidDimensions(format!(
            "{name} must be between 1 and {max}, got {value}"
        )));
    }
    // Bounded by `max` above, which fits comfortably.
    Ok(value as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinAddress {
    pub row: u32,
    pub rack: u32,
    pub bin: u32,
}

impl fmt::Display for BinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}K{}B{}", self.row, self.rack, self.bin)
    }
}

impl FromStr for BinAddress {
    type Err = BinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s)
    }
}

pub fn format_address(row: u32, rack: u32, bin: u32) -> String {
    BinAddress { row, rack, bin }.to_string()
}

/// Parse `R{row}K{rack}B{bin}`. Components are runs of ASCII digits; signs
/// and whitespace are rejected, leading zeros are not. Range is not checked
/// here, see [`validate_selection`].
pub fn parse_address(s: &str) -> Result<BinAddress, BinError> {
    let malformed = || BinError::MalformedAddress(s.to_string());

    let rest = s.strip_prefix('R').ok_or_else(malformed)?;
    let (row, rest) = rest.split_once('K').ok_or_else(malformed)?;
    let (rack, bin) = rest.split_once('B').ok_or_else(malformed)?;

    let component = |part: &str| -> Result<u32, BinError> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        part.parse().map_err(|_| malformed())
    };

    Ok(BinAddress {
        row: component(row)?,
        rack: component(rack)?,
        bin: component(bin)?,
    })
}

/// Check a proposed selection against the warehouse grid. Inputs are signed
/// because they usually come straight from a request body.
pub fn validate_selection(
    dims: &WarehouseDims,
    row: i64,
    rack: i64,
    bin: i64,
) -> Result<BinAddress, BinError> {
    let in_range = |value: i64, max: u32| value >= 1 && value <= i64::from(max);

    if in_range(row, dims.rows)
        && in_range(rack, dims.racks_per_row)
        && in_range(bin, dims.bins_per_rack)
    {
        return Ok(BinAddress {
            row: row as u32,
            rack: rack as u32,
            bin: bin as u32,
        });
    }

    Err(BinError::OutOfRange {
        row,
        rack,
        bin,
        rows: dims.rows,
        racks_per_row: dims.racks_per_row,
        bins_per_rack: dims.bins_per_rack,
    })
}

/// Text encoded into a bin label: `{warehouse_code}-R{row}K{rack}B{bin}`.
pub fn build_barcode_payload(warehouse_code: &str, row: u32, rack: u32, bin: u32) -> String {
    format!("{}-{}", warehouse_code, format_address(row, rack, bin))
}
