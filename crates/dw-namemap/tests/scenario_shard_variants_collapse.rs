use dw_namemap::canonicalize;

#[test]
fn scenario_all_shard_variants_collapse_to_one_canonical_name() {
    let variants = [
        "orders_runtime",
        "orders_1699999999",
        "orders_4fae1a3e-9c1d-4b2a-8f6e-2a7b9c0d1e2f",
        "orders_4fae1a3e_9c1d_4b2a_8f6e_2a7b9c0d1e2f",
        "orders_4fae1a3e9c1d4b2a8f6e2a7b9c0d1e2f",
        "orders_333367878_2018",
    ];

    for raw in variants {
        assert_eq!(canonicalize(raw), "orders", "variant {raw} did not collapse");
    }
}

#[test]
fn scenario_canonicalize_is_idempotent_on_its_results() {
    let raw_names = [
        "orders",
        "orders_runtime",
        "orders_123456789",
        "order_bom_0e9b60a4_d6ed_473d_a326_9e8c8f744ec2",
        "users_a1b2c3d4-e5f6-7890-abcd-ef1234567890",
        "order_bom_item_333367878_2018",
        "no_rule_matches_here",
    ];

    for raw in raw_names {
        let once = canonicalize(raw);
        assert_eq!(canonicalize(&once), once, "canonicalize({raw}) not idempotent");
    }
}
