//! Stable error code constants.
//!
//! Every error variant in this crate maps to exactly one code via its
//! `code()` accessor. Codes are part of the public contract: scripts and
//! bug reports reference them, so existing codes must never be renamed or
//! reused for a different condition.

/// Row/column ordering merge exceeded its iteration cap.
pub const ORDER_STALLED: &str = "TBLDIFF_ORDER_001";

/// Self-alignment of the patch source failed during row lookup.
pub const PATCH_SOURCE_LOOKUP: &str = "TBLDIFF_PATCH_001";

/// JSON input is not an object or array of rows.
pub const JSON_NOT_TABULAR: &str = "TBLDIFF_JSON_001";

/// JSON object held no sheet with `columns` and `rows` fields.
pub const JSON_SHEET_MISSING: &str = "TBLDIFF_JSON_002";

/// A JSON sheet row was neither an array nor an object.
pub const JSON_BAD_ROW: &str = "TBLDIFF_JSON_003";
