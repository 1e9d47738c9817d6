// 🔑 Composite natural keys - structured key types with fixed serializations
// All keys derive from the RAW record, never the projected one, so key
// derivation is independent of what the allow-list happens to retain

use std::fmt;

use crate::errors::FeedError;
use crate::fields::RawRecord;

/// Clearing fiscal-year sentinel meaning "not cleared".
pub const CLEARING_NONE: &str = "0000";

// ============================================================================
// DOCUMENT KEY
// ============================================================================

/// Natural key of a Document vertex: `{fiscalYear}-{documentNumber}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub fiscal_year: String,
    pub document_number: String,
}

impl DocumentKey {
    /// Derive the owning document's key from a raw header or position record.
    pub fn from_raw(raw: &RawRecord) -> Result<Self, FeedError> {
        Ok(DocumentKey {
            fiscal_year: require(raw, "GJAHR")?,
            document_number: require(raw, "BELNR")?,
        })
    }

    /// Derive the clearing reference from a raw position record.
    ///
    /// Returns `None` when the clearing year carries the `"0000"` sentinel:
    /// the position was never cleared and no EClearing edge must exist.
    pub fn clearing_from_raw(raw: &RawRecord) -> Result<Option<Self>, FeedError> {
        let fiscal_year = require(raw, "AUGGJ")?;
        if fiscal_year == CLEARING_NONE {
            return Ok(None);
        }

        Ok(Some(DocumentKey {
            fiscal_year,
            document_number: require(raw, "AUGBL")?,
        }))
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.fiscal_year, self.document_number)
    }
}

// ============================================================================
// POSITION KEY
// ============================================================================

/// Natural key of a Position vertex:
/// `{fiscalYear}-{documentNumber}-{lineNumber}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub fiscal_year: String,
    pub document_number: String,
    pub line_number: String,
}

impl PositionKey {
    pub fn from_raw(raw: &RawRecord) -> Result<Self, FeedError> {
        Ok(PositionKey {
            fiscal_year: require(raw, "GJAHR")?,
            document_number: require(raw, "BELNR")?,
            line_number: require(raw, "BUZEI")?,
        })
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.fiscal_year, self.document_number, self.line_number
        )
    }
}

fn require(raw: &RawRecord, field: &str) -> Result<String, FeedError> {
    raw.get(field)
        .cloned()
        .ok_or_else(|| FeedError::missing(field))
}
