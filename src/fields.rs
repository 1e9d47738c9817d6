// 📋 Field Projector - Allow-list projection with per-field coercion
// Raw NDJSON records in, typed graph attributes out

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::FeedError;

/// A decoded input line: flat mapping of wire field name to string value.
pub type RawRecord = HashMap<String, String>;

// ============================================================================
// COERCIONS
// ============================================================================

/// How a single field is transformed on its way into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Pass the string through unchanged
    Identity,

    /// Parse as integer (fiscal years etc.)
    Numeric,

    /// Parse as exact decimal - currency amounts must not pick up
    /// binary floating-point rounding
    Decimal,

    /// Reinterpret an 8-digit YYYYMMDD string as YYYY-MM-DD
    Date,
}

impl Coercion {
    /// Apply this coercion to one field value.
    pub fn apply(&self, field: &str, value: &str) -> Result<FieldValue, FeedError> {
        match self {
            Coercion::Identity => Ok(FieldValue::Text(value.to_string())),

            Coercion::Numeric => value
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| FeedError::malformed(field, value, "expected an integer")),

            Coercion::Decimal => Decimal::from_str(value)
                .map(FieldValue::Decimal)
                .map_err(|_| FeedError::malformed(field, value, "expected a decimal amount")),

            Coercion::Date => {
                // Must be exactly 8 ASCII digits so the byte slices below
                // are always valid
                let bytes = value.as_bytes();
                if bytes.len() != 8 || !bytes.iter().all(|b| b.is_ascii_digit()) {
                    return Err(FeedError::malformed(
                        field,
                        value,
                        "expected an 8-digit YYYYMMDD date",
                    ));
                }
                Ok(FieldValue::Text(format!(
                    "{}-{}-{}",
                    &value[0..4],
                    &value[4..6],
                    &value[6..8]
                )))
            }
        }
    }
}

// ============================================================================
// FIELD VALUES
// ============================================================================

/// A coerced attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
}

impl FieldValue {
    /// Store payload representation. Decimals go out as their exact
    /// textual form, never as a binary float.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(n) => serde_json::Value::from(*n),
            FieldValue::Decimal(d) => serde_json::Value::String(d.to_string()),
        }
    }
}

// ============================================================================
// FIELD SPECS (allow-lists)
// ============================================================================

/// One allow-list entry: wire field `source` becomes graph attribute
/// `target` after `coercion`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub source: &'static str,
    pub target: &'static str,
    pub coercion: Coercion,
}

/// Ordered allow-list for one record shape. Anything not listed here is
/// dropped on projection - this is deliberate selection, not validation.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    rules: Vec<FieldRule>,
}

impl FieldSpec {
    /// Allow-list for header (BKPF-style) records.
    pub fn document() -> Self {
        FieldSpec {
            rules: vec![
                rule("GJAHR", "fiscalYear", Coercion::Numeric),
                rule("BELNR", "documentNumber", Coercion::Identity),
                rule("BLART", "documentType", Coercion::Identity),
                rule("BUDAT", "postingDate", Coercion::Date),
                rule("BLDAT", "documentDate", Coercion::Date),
            ],
        }
    }

    /// Allow-list for line-item (BSEG-style) records. GJAHR/BELNR/BUZEI
    /// participate in the position key but only BUZEI survives projection.
    pub fn position() -> Self {
        FieldSpec {
            rules: vec![
                rule("HKONT", "glAccount", Coercion::Identity),
                rule("BUZEI", "lineNumber", Coercion::Identity),
                rule("SHKZG", "debitCreditIndicator", Coercion::Identity),
                rule("DMBTR", "amountLocalCurrency", Coercion::Decimal),
            ],
        }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }
}

fn rule(source: &'static str, target: &'static str, coercion: Coercion) -> FieldRule {
    FieldRule {
        source,
        target,
        coercion,
    }
}

/// Project a raw record through an allow-list.
///
/// Fields present in both the record and the spec are coerced and emitted
/// under their target name; fields missing from the record are skipped even
/// when listed; fields not listed are dropped. Pure function.
pub fn project(
    raw: &RawRecord,
    spec: &FieldSpec,
) -> Result<Vec<(&'static str, FieldValue)>, FeedError> {
    let mut projected = Vec::with_capacity(spec.rules().len());

    for rule in spec.rules() {
        if let Some(value) = raw.get(rule.source) {
            projected.push((rule.target, rule.coercion.apply(rule.source, value)?));
        }
    }

    Ok(projected)
}
