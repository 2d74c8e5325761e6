//! Display codes for stored entities.
//!
//! A code is a fixed one-letter prefix per entity kind followed by the
//! storage-assigned identifier in decimal: `W7` for warehouse 7, `A15` for
//! asset 15. Identifiers are unique per table, so codes are too.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Warehouse,
    Asset,
}

impl EntityKind {
    pub fn prefix(self) -> char {
        match self {
            EntityKind::Warehouse => 'W',
            EntityKind::Asset => 'A',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'W' => Some(EntityKind::Warehouse),
            'A' => Some(EntityKind::Asset),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Warehouse => f.write_str("warehouse"),
            EntityKind::Asset => f.write_str("asset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("'{0}' is not a valid entity code")]
    Malformed(String),
}

/// Derive the display code for an entity.
///
/// Must only be called with an identifier the store has already committed.
/// The result is a pure function of its inputs, so recomputing it for a
/// record whose code was never written is always safe.
pub fn assign_code(kind: EntityKind, id: i64) -> String {
    debug_assert!(id > 0, "identifiers are assigned by storage and positive");
    format!("{}{}", kind.prefix(), id)
}

/// Inverse of [`assign_code`]. Rejects leading zeros so every code decodes to
/// exactly one identifier.
pub fn parse_code(code: &str) -> Result<(EntityKind, i64), CodeError> {
    let malformed = || CodeError::Malformed(code.to_string());

    let mut chars = code.chars();
    let kind = chars
        .next()
        .and_then(EntityKind::from_prefix)
        .ok_or_else(malformed)?;

    let digits = chars.as_str();
    if !is_canonical_number(digits) {
        return Err(malformed());
    }

    let id: i64 = digits.parse().map_err(|_| malformed())?;
    if id == 0 {
        return Err(malformed());
    }
    Ok((kind, id))
}

/// Non-empty ASCII digits without a leading zero (a lone "0" is allowed and
/// left for the caller to judge).
fn is_canonical_number(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && !(s.len() > 1 && s.starts_with('0'))
}
