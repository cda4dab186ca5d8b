//! Default constants for key index configuration.
//!
//! All sizing numbers are centralized here.

// =============================================================================
// Ordinal Table Defaults
// =============================================================================

/// Initial slot count of a freshly created ordinal table
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Fraction of slots that may be occupied before the table doubles
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;

/// Upper bound on slots per table. `None` leaves growth unbounded.
pub const DEFAULT_MAX_CAPACITY: Option<usize> = None;

// =============================================================================
// Environment
// =============================================================================

/// Prefix for environment variable overrides (`KEYINDEX_LOAD_FACTOR`, ...)
pub const ENV_PREFIX: &str = "KEYINDEX_";
