//! dw-namemap
//!
//! Canonical table-name mapping for CDC-sharded physical tables.
//!
//! CDC jobs shard, version, and time-partition physical tables on the source
//! side (`orders_runtime`, `orders_169384756`, `orders_<uuid>`); all of them
//! feed the same logical table. This crate collapses those naming variants
//! onto one canonical name with an ordered list of suffix rules.
//!
//! Deterministic, pure logic. No IO.

mod rules;

pub use rules::canonicalize;
