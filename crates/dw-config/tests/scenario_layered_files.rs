use std::io::Write;

use dw_config::load_layered;

#[test]
fn scenario_local_override_file_layers_on_top_of_base() {
    let dir = tempfile::tempdir().unwrap();

    let base_path = dir.path().join("driftwatch.yaml");
    let mut base = std::fs::File::create(&base_path).unwrap();
    writeln!(
        base,
        "target: {{}}\nsource:\n  schemas: [sales, billing]\n  poll_interval_secs: 9"
    )
    .unwrap();

    let local_path = dir.path().join("driftwatch.local.yaml");
    let mut local = std::fs::File::create(&local_path).unwrap();
    writeln!(local, "source:\n  poll_interval_secs: 60").unwrap();

    let loaded = load_layered(&[
        base_path.to_str().unwrap(),
        local_path.to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(loaded.config.source.poll_interval_secs, 60);
    assert_eq!(
        loaded.config.source_schemas(),
        vec!["sales".to_string(), "billing".to_string()]
    );
    loaded.config.validate().unwrap();
}

#[test]
fn scenario_missing_file_is_a_config_error() {
    let err = load_layered(&["/nonexistent/driftwatch.yaml"]).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
