use std::sync::LazyLock;

use regex::Regex;

/// Shadow/runtime tables carry a fixed literal marker after the last
/// underscore.
const RUNTIME_SUFFIX: &str = "_runtime";

/// Generated shard/version ids are long purely-numeric suffixes. Nine digits
/// is the shortest id the CDC jobs emit; epoch-second and epoch-milli ids are
/// longer, so match nine or more.
static SHARD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<stem>.+)_[0-9]{9,}$").expect("shard-id pattern"));

/// `<id>_<year>` compound suffix, e.g. `order_bom_item_333367878_2018`.
static SHARD_ID_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<stem>.+)_[0-9]{9,}_[0-9]{4}$").expect("shard-id-year pattern"));

/// UUID suffix in 8-4-4-4-12 grouping with underscore separators, optionally
/// followed by a four-digit year, e.g.
/// `order_bom_0e9b60a4_d6ed_473d_a326_9e8c8f744ec2`.
static UUID_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<stem>.+)_[0-9a-fA-F]{8}_[0-9a-fA-F]{4}_[0-9a-fA-F]{4}_[0-9a-fA-F]{4}_[0-9a-fA-F]{12}(?:_[0-9]{4})?$",
    )
    .expect("underscore-uuid pattern")
});

/// UUID suffix in canonical hyphenated 8-4-4-4-12 grouping, e.g.
/// `users_a1b2c3d4-e5f6-7890-abcd-ef1234567890`.
static UUID_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<stem>.+)_[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("hyphen-uuid pattern")
});

/// Ungrouped 32-hex-character UUID suffix, e.g. `products_a1b2...7890`.
static UUID_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<stem>.+)_[0-9a-fA-F]{32}$").expect("compact-uuid pattern"));

/// Map a physical source-side table name onto its canonical logical name.
///
/// Rules are tried in a fixed priority order and the first match wins:
///
/// 1. strip a trailing `_runtime` marker;
/// 2. strip a trailing purely-numeric shard/version id (nine or more digits);
/// 3. strip a trailing UUID (grouped with `_` or `-`, or ungrouped 32 hex);
/// 4. strip a trailing `<id>_<four-digit-year>` compound suffix;
/// 5. otherwise return the input unchanged.
///
/// A rule whose application would leave an empty name does not apply. Exactly
/// one suffix is stripped per call, so the result of a match is itself
/// canonical for that rule.
pub fn canonicalize(raw: &str) -> String {
    if !raw.contains('_') {
        return raw.to_string();
    }

    if let Some(stem) = raw.strip_suffix(RUNTIME_SUFFIX) {
        if !stem.is_empty() {
            return stem.to_string();
        }
    }

    for pattern in [&*SHARD_ID, &*UUID_UNDERSCORE, &*UUID_HYPHEN, &*UUID_COMPACT, &*SHARD_ID_YEAR] {
        if let Some(caps) = pattern.captures(raw) {
            return caps["stem"].to_string();
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_is_unchanged() {
        assert_eq!(canonicalize("orders"), "orders");
        assert_eq!(canonicalize("order_bom_item"), "order_bom_item");
    }

    #[test]
    fn runtime_suffix_is_stripped() {
        assert_eq!(canonicalize("orders_runtime"), "orders");
        assert_eq!(canonicalize("order_bom_runtime"), "order_bom");
    }

    #[test]
    fn bare_runtime_marker_is_not_stripped() {
        // Stripping would leave an empty name, so the rule does not apply.
        assert_eq!(canonicalize("_runtime"), "_runtime");
    }

    #[test]
    fn numeric_shard_id_is_stripped() {
        assert_eq!(canonicalize("orders_123456789"), "orders");
        assert_eq!(canonicalize("orders_1699999999"), "orders");
    }

    #[test]
    fn short_numeric_suffix_is_kept() {
        // Four digits alone look like a year partition, not a shard id.
        assert_eq!(canonicalize("report_2024"), "report_2024");
        assert_eq!(canonicalize("orders_12345678"), "orders_12345678");
    }

    #[test]
    fn shard_id_year_compound_is_stripped() {
        assert_eq!(canonicalize("order_bom_item_333367878_2018"), "order_bom_item");
    }

    #[test]
    fn underscore_uuid_is_stripped() {
        assert_eq!(
            canonicalize("order_bom_0e9b60a4_d6ed_473d_a326_9e8c8f744ec2"),
            "order_bom"
        );
    }

    #[test]
    fn underscore_uuid_with_year_is_stripped() {
        assert_eq!(
            canonicalize("order_bom_item_05355967_c503_4a2d_9dd1_2dd7a9ffa15e_2030"),
            "order_bom_item"
        );
    }

    #[test]
    fn hyphen_uuid_is_stripped() {
        assert_eq!(
            canonicalize("users_a1b2c3d4-e5f6-7890-abcd-ef1234567890"),
            "users"
        );
    }

    #[test]
    fn compact_uuid_is_stripped() {
        assert_eq!(
            canonicalize("products_a1b2c3d4e5f67890abcdef1234567890"),
            "products"
        );
    }

    #[test]
    fn non_hex_suffix_of_uuid_length_is_kept() {
        assert_eq!(
            canonicalize("products_z1b2c3d4e5f67890abcdef1234567890"),
            "products_z1b2c3d4e5f67890abcdef1234567890"
        );
    }

    #[test]
    fn numeric_stem_is_allowed() {
        // No aggressive normalization: a purely numeric canonical name stands.
        assert_eq!(canonicalize("20240101_runtime"), "20240101");
    }

    #[test]
    fn only_the_last_suffix_is_stripped() {
        assert_eq!(canonicalize("a_123456789_123456789"), "a_123456789");
    }
}
