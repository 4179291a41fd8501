//! Parameter normalization tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{json, Value};
use unitrack_core::params::{to_json_compatible, to_nested_json, LIST_LEN_KEY};
use unitrack_core::{normalize, normalize_with, ConfigValue, NormalizeOptions, ToConfigValue, TrackingError};

fn flat(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn test_none_yields_empty_params() {
    let params = normalize(None).unwrap();
    assert!(params.is_empty());
}

#[test]
fn test_flat_mapping_is_unchanged() {
    let config = ConfigValue::mapping([
        ("lr", ConfigValue::from(0.001)),
        ("epochs", ConfigValue::from(10)),
        ("name", ConfigValue::from("baseline")),
        ("shuffle", ConfigValue::from(true)),
        ("seed", ConfigValue::Null),
    ]);
    let params = normalize(Some(&config)).unwrap();
    assert_eq!(
        params,
        flat(json!({"lr": 0.001, "epochs": 10, "name": "baseline", "shuffle": true, "seed": null}))
    );
}

#[test]
fn test_nested_mapping_joins_keys() {
    let config = ConfigValue::mapping([("a", ConfigValue::mapping([("b", 1)]))]);
    assert_eq!(normalize(Some(&config)).unwrap(), flat(json!({"a/b": 1})));

    let config = ConfigValue::mapping([(
        "model",
        ConfigValue::mapping([
            ("lr", ConfigValue::from(0.1)),
            ("optim", ConfigValue::mapping([("beta", 0.9)])),
        ]),
    )]);
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({"model/lr": 0.1, "model/optim/beta": 0.9}))
    );
}

#[test]
fn test_sequence_becomes_indexed_mapping() {
    let config = ConfigValue::mapping([("items", ConfigValue::sequence([10, 20]))]);
    let params = normalize(Some(&config)).unwrap();
    assert_eq!(params, flat(json!({"items/list_len": 2, "items/0": 10, "items/1": 20})));

    let keys: Vec<&str> = params.keys().map(String::as_str).collect();
    assert_eq!(keys, ["items/list_len", "items/0", "items/1"]);
}

#[test]
fn test_empty_sequence_keeps_only_length() {
    let config = ConfigValue::mapping([("items", ConfigValue::Sequence(vec![]))]);
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({"items/list_len": 0}))
    );
}

#[test]
fn test_mixed_sequence_transforms_each_element() {
    let config = ConfigValue::mapping([(
        "stages",
        ConfigValue::Sequence(vec![
            ConfigValue::from(1),
            ConfigValue::from("warmup"),
            ConfigValue::mapping([("lr", 0.5)]),
            ConfigValue::sequence([true]),
            ConfigValue::from(PathBuf::from("/data")),
        ]),
    )]);
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({
            "stages/list_len": 5,
            "stages/0": 1,
            "stages/1": "warmup",
            "stages/2/lr": 0.5,
            "stages/3/list_len": 1,
            "stages/3/0": true,
            "stages/4": "/data",
        }))
    );
}

#[test]
fn test_path_and_enum_leaves() {
    let config = ConfigValue::mapping([
        ("p", ConfigValue::from(PathBuf::from("/tmp/ckpt"))),
        ("e", ConfigValue::enumeration("Adam", "adam")),
    ]);
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({"p": "/tmp/ckpt", "e": "adam"}))
    );
}

#[test]
fn test_enum_with_structured_value_is_flattened() {
    let config = ConfigValue::mapping([(
        "sched",
        ConfigValue::enumeration("Cosine", ConfigValue::mapping([("warmup", 100)])),
    )]);
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({"sched/warmup": 100}))
    );
}

struct TrainerConfig {
    lr: f64,
    output_dir: PathBuf,
    layers: Vec<u32>,
}

impl ToConfigValue for TrainerConfig {
    fn to_config_value(&self) -> ConfigValue {
        ConfigValue::record(
            "TrainerConfig",
            [
                ("lr", ConfigValue::from(self.lr)),
                ("output_dir", ConfigValue::from(self.output_dir.clone())),
                ("layers", ConfigValue::from(self.layers.clone())),
            ],
        )
    }
}

#[test]
fn test_record_is_treated_as_mapping() {
    let trainer = TrainerConfig {
        lr: 0.01,
        output_dir: PathBuf::from("out"),
        layers: vec![64],
    };
    let config = ConfigValue::mapping([("trainer", trainer.to_config_value())]);
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({
            "trainer/lr": 0.01,
            "trainer/output_dir": "out",
            "trainer/layers/list_len": 1,
            "trainer/layers/0": 64,
        }))
    );
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Precision {
    Bf16,
}

#[derive(Serialize)]
struct DataConfig {
    path: PathBuf,
    precision: Precision,
    batch_size: usize,
}

#[test]
fn test_from_serialize() {
    let config = ConfigValue::from_serialize(&DataConfig {
        path: PathBuf::from("/data/train"),
        precision: Precision::Bf16,
        batch_size: 32,
    })
    .unwrap();
    assert_eq!(
        normalize(Some(&config)).unwrap(),
        flat(json!({"path": "/data/train", "precision": "bf16", "batch_size": 32}))
    );
}

#[test]
fn test_yaml_config_with_tagged_enum() {
    let yaml: serde_yaml::Value = serde_yaml::from_str(
        "model:\n  hidden: [128, 64]\noptim: !Adam\n  lr: 0.001\n1: numeric key\n",
    )
    .unwrap();
    let params = normalize(Some(&ConfigValue::from(yaml))).unwrap();
    assert_eq!(
        params,
        flat(json!({
            "model/hidden/list_len": 2,
            "model/hidden/0": 128,
            "model/hidden/1": 64,
            "optim/lr": 0.001,
            "1": "numeric key",
        }))
    );
}

#[test]
fn test_preserve_lists_keeps_arrays_as_leaves() {
    let config = ConfigValue::mapping([(
        "model",
        ConfigValue::mapping([(
            "layers",
            ConfigValue::Sequence(vec![
                ConfigValue::from(PathBuf::from("a.pt")),
                ConfigValue::mapping([("units", 4)]),
            ]),
        )]),
    )]);
    let params = normalize_with(Some(&config), &NormalizeOptions::default().preserve_lists()).unwrap();
    assert_eq!(params, flat(json!({"model/layers": ["a.pt", {"units": 4}]})));
}

#[test]
fn test_custom_separator() {
    let config = ConfigValue::mapping([("a", ConfigValue::mapping([("b", ConfigValue::sequence([1]))]))]);
    let params = normalize_with(Some(&config), &NormalizeOptions::default().with_separator(".")).unwrap();
    assert_eq!(params, flat(json!({"a.b.list_len": 1, "a.b.0": 1})));
}

#[test]
fn test_empty_nested_mapping_leaves_no_key() {
    let config = ConfigValue::mapping([
        ("empty", ConfigValue::Mapping(vec![])),
        ("x", ConfigValue::from(1)),
    ]);
    assert_eq!(normalize(Some(&config)).unwrap(), flat(json!({"x": 1})));
}

#[test]
fn test_top_level_sequence_is_indexed() {
    let config = ConfigValue::sequence(["a", "b"]);
    let params = normalize(Some(&config)).unwrap();
    assert_eq!(params[LIST_LEN_KEY], 2);
    assert_eq!(params, flat(json!({"list_len": 2, "0": "a", "1": "b"})));
}

#[test]
fn test_top_level_scalar_is_rejected() {
    let err = normalize(Some(&ConfigValue::from(3))).unwrap_err();
    assert!(matches!(err, TrackingError::InvalidParams(_)));

    let err = normalize_with(
        Some(&ConfigValue::sequence([1])),
        &NormalizeOptions::default().preserve_lists(),
    )
    .unwrap_err();
    assert!(matches!(err, TrackingError::InvalidParams(_)));
}

#[test]
fn test_non_finite_float_reports_its_path() {
    let config = ConfigValue::mapping([("opt", ConfigValue::mapping([("eps", f64::NAN)]))]);
    match normalize(Some(&config)).unwrap_err() {
        TrackingError::NonFiniteParam(path) => assert_eq!(path, "opt/eps"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_to_json_compatible_modes() {
    let config = ConfigValue::mapping([("xs", ConfigValue::sequence([1, 2]))]);
    assert_eq!(
        to_json_compatible(&config, true).unwrap(),
        json!({"xs": {"list_len": 2, "0": 1, "1": 2}})
    );
    assert_eq!(to_json_compatible(&config, false).unwrap(), json!({"xs": [1, 2]}));
}

#[test]
fn test_nested_json_nulls_non_finite_floats() {
    let config = ConfigValue::mapping([
        ("eps", ConfigValue::from(f64::NEG_INFINITY)),
        ("xs", ConfigValue::sequence([0.5, f64::NAN])),
        ("p", ConfigValue::from(PathBuf::from("/ckpt"))),
    ]);
    assert_eq!(
        to_nested_json(&config),
        json!({"eps": null, "xs": [0.5, null], "p": "/ckpt"})
    );
    assert!(matches!(
        to_json_compatible(&config, false),
        Err(TrackingError::NonFiniteParam(path)) if path == "eps"
    ));
}

#[test]
fn test_btreemap_and_option_conversions() {
    let mut map = BTreeMap::new();
    map.insert("b".to_string(), Some(2));
    map.insert("a".to_string(), None);
    let params = normalize(Some(&ConfigValue::from(map))).unwrap();
    assert_eq!(params, flat(json!({"a": null, "b": 2})));
}
