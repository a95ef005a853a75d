// Entity Models - typed views over canonical records
//
// The store keeps loosely typed rows; report assembly reads them through these
// views so every join and predicate works on named fields instead of column
// strings. Views are value objects rebuilt on every report call.

pub mod apac;
pub mod billing;
pub mod catheter;
pub mod census;
pub mod sessions;

pub use apac::LaudoApac;
pub use billing::{BillingLine, SessionKind};
pub use catheter::CatheterEvent;
pub use census::{CensusEntry, SerologyMarkers};
pub use sessions::SessionCount;

/// Payer label of the public insurer
pub const PUBLIC_INSURER: &str = "SUS";

/// Case-insensitive exact match
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Case-insensitive substring match
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Payer equals the public insurer, ignoring case (no trimming beyond ingestion's)
pub fn is_public_insurer(payer: &str) -> bool {
    eq_ignore_case(payer, PUBLIC_INSURER)
}
