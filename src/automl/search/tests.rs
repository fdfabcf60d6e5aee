//! Parameter space tests.

use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn reference_like_space() -> ParameterSpace {
    ParameterSpace::new(vec![
        HyperparameterSpec::continuous("learning_rate", 0.001, 0.1),
        HyperparameterSpec::integer("epochs", 1, 11),
        HyperparameterSpec::continuous("dropout_rate", 0.001, 0.1),
        HyperparameterSpec::categorical("batch_size", [32, 64, 128, 256]),
        HyperparameterSpec::categorical("pooling_type", ["MP", "AP"]),
    ])
    .expect("valid space")
}

#[test]
fn test_space_dimensions() {
    let space = reference_like_space();
    assert_eq!(space.dimension(), 5);
    assert_eq!(space.numeric_dimensions(), 3);
    assert!(space.get("epochs").is_some());
    assert!(space.get("momentum").is_none());
}

#[test]
fn test_space_preserves_declaration_order() {
    let space = reference_like_space();
    let names: Vec<&str> = space.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        ["learning_rate", "epochs", "dropout_rate", "batch_size", "pooling_type"]
    );
}

#[test]
fn test_min_greater_than_max_rejected() {
    let err = ParameterSpace::new(vec![HyperparameterSpec::continuous("lr", 0.5, 0.1)])
        .expect_err("min > max must fail");
    assert!(matches!(err, AbcError::InvalidSpec { ref param, .. } if param == "lr"));

    let err = ParameterSpace::new(vec![HyperparameterSpec::integer("epochs", 11, 1)])
        .expect_err("min > max must fail");
    assert!(matches!(err, AbcError::InvalidSpec { .. }));
}

#[test]
fn test_empty_choices_rejected() {
    let empty: [i64; 0] = [];
    let err = ParameterSpace::new(vec![HyperparameterSpec::categorical("batch_size", empty)])
        .expect_err("empty choices must fail");
    assert!(err.to_string().contains("choices must not be empty"));
}

#[test]
fn test_non_finite_bounds_rejected() {
    let err = ParameterSpace::new(vec![HyperparameterSpec::continuous(
        "lr",
        0.0,
        f64::INFINITY,
    )])
    .expect_err("infinite bound must fail");
    assert!(matches!(err, AbcError::InvalidSpec { .. }));
}

#[test]
fn test_duplicate_names_rejected() {
    let err = ParameterSpace::new(vec![
        HyperparameterSpec::continuous("lr", 0.0, 1.0),
        HyperparameterSpec::integer("lr", 0, 1),
    ])
    .expect_err("duplicate must fail");
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_empty_space_rejected() {
    assert!(ParameterSpace::new(Vec::new()).is_err());
}

#[test]
fn test_degenerate_range_allowed() {
    let space = ParameterSpace::new(vec![HyperparameterSpec::integer("epochs", 3, 3)])
        .expect("min == max is valid");
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..20 {
        assert_eq!(space.sample(&mut rng).get_i64("epochs"), Some(3));
    }
}

#[test]
fn test_sample_within_bounds() {
    let space = reference_like_space();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let config = space.sample(&mut rng);
        assert!(space.contains(&config), "out of bounds: {config}");
    }
}

#[test]
fn test_sample_deterministic_for_seed() {
    let space = reference_like_space();
    let a = space.sample(&mut StdRng::seed_from_u64(7));
    let b = space.sample(&mut StdRng::seed_from_u64(7));
    assert_eq!(a, b);
}

#[test]
fn test_integer_sample_biased_toward_min() {
    // round((11 - 1) * U) never adds `min`, so draws below 0.05 and the
    // whole raw value 0 collapse onto min = 1.
    let spec = HyperparameterSpec::integer("epochs", 1, 11);
    let mut rng = StdRng::seed_from_u64(3);
    let mut at_min = 0;
    let mut at_max = 0;
    let n = 20_000;
    for _ in 0..n {
        match spec.sample(&mut rng) {
            ParamValue::Int(1) => at_min += 1,
            ParamValue::Int(10) => at_max += 1,
            ParamValue::Int(v) => assert!((1..=10).contains(&v), "unexpected {v}"),
            other => panic!("integer spec produced {other:?}"),
        }
    }
    // raw 0 (p = 0.05) and raw 1 (p = 0.1) both map to 1; max raw is 10.
    assert!(at_min > at_max, "min={at_min} max={at_max}");
}

#[test]
fn test_integer_sample_full_i64_range() {
    let spec = HyperparameterSpec::integer("x", i64::MIN, i64::MAX);
    assert!(spec.validate().is_ok());
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let value = spec.sample(&mut rng);
        assert!(matches!(value, ParamValue::Int(_)));
        assert!(spec.contains(&value));
    }
}

#[test]
fn test_categorical_sample_covers_choices() {
    let spec = HyperparameterSpec::categorical("pooling_type", ["MP", "AP"]);
    let mut rng = StdRng::seed_from_u64(11);
    let draws: Vec<ParamValue> = (0..200).map(|_| spec.sample(&mut rng)).collect();
    assert!(draws.contains(&ParamValue::from("MP")));
    assert!(draws.contains(&ParamValue::from("AP")));
}

#[test]
fn test_clamp_continuous() {
    let spec = HyperparameterSpec::continuous("dropout_rate", 0.001, 0.1);
    assert_eq!(spec.clamp(ParamValue::Float(0.5)), ParamValue::Float(0.1));
    assert_eq!(spec.clamp(ParamValue::Float(-0.5)), ParamValue::Float(0.001));
    assert_eq!(spec.clamp(ParamValue::Float(0.05)), ParamValue::Float(0.05));
}

#[test]
fn test_clamp_integer_rounds_floats_half_to_even() {
    let spec = HyperparameterSpec::integer("epochs", 1, 11);
    assert_eq!(spec.clamp(ParamValue::Float(2.5)), ParamValue::Int(2));
    assert_eq!(spec.clamp(ParamValue::Float(3.5)), ParamValue::Int(4));
    assert_eq!(spec.clamp(ParamValue::Float(-3.0)), ParamValue::Int(1));
}

#[test]
fn test_clamp_categorical_is_identity() {
    let space = reference_like_space();
    let spec = space.get("pooling_type").expect("pooling_type");
    let value = ParamValue::from("XP");
    assert_eq!(space.clamp(spec, value.clone()), value);
    assert!(!spec.contains(&value));
}

#[test]
fn test_contains_rejects_missing_and_extra() {
    let space = reference_like_space();
    let mut rng = StdRng::seed_from_u64(5);
    let mut config = space.sample(&mut rng);
    config.insert("momentum", ParamValue::Float(0.9));
    assert!(!space.contains(&config));

    let partial: Configuration = space
        .sample(&mut rng)
        .iter()
        .filter(|(k, _)| *k != "epochs")
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    assert!(!space.contains(&partial));
}

#[test]
fn test_contains_rejects_wrong_type() {
    let spec = HyperparameterSpec::integer("epochs", 1, 11);
    assert!(!spec.contains(&ParamValue::Float(3.0)));
    assert!(spec.contains(&ParamValue::Int(3)));
}

#[test]
fn test_configuration_getters() {
    let mut config = Configuration::new();
    config.insert("learning_rate", ParamValue::Float(0.01));
    config.insert("epochs", ParamValue::Int(5));
    config.insert("pooling_type", ParamValue::from("AP"));

    assert_eq!(config.get_f64("learning_rate"), Some(0.01));
    assert_eq!(config.get_i64("epochs"), Some(5));
    assert_eq!(config.get_usize("epochs"), Some(5));
    assert_eq!(config.get_str("pooling_type"), Some("AP"));
    assert_eq!(config.get_str("epochs"), None);
    assert_eq!(config.len(), 3);
}

#[test]
fn test_configuration_display() {
    let mut config = Configuration::new();
    config.insert("epochs", ParamValue::Int(5));
    config.insert("pooling_type", ParamValue::from("MP"));
    assert_eq!(config.to_string(), "{epochs=5, pooling_type=MP}");
}

#[test]
fn test_space_json_roundtrip() {
    let space = reference_like_space();
    let json = serde_json::to_string(&space).expect("serialize");
    let restored: ParameterSpace = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(space, restored);
}

#[test]
fn test_space_json_format() {
    let json = r#"[
        {"name": "learning_rate", "kind": "continuous", "min": 0.001, "max": 0.1},
        {"name": "epochs", "kind": "integer", "min": 1, "max": 11},
        {"name": "batch_size", "kind": "categorical", "choices": [32, 64]},
        {"name": "pooling_type", "kind": "categorical", "choices": ["MP", "AP"]}
    ]"#;
    let space: ParameterSpace = serde_json::from_str(json).expect("parse");
    assert_eq!(space.dimension(), 4);
    assert_eq!(
        space.get("batch_size").map(|s| &s.kind),
        Some(&ParamKind::Categorical {
            choices: vec![ParamValue::Int(32), ParamValue::Int(64)]
        })
    );
}

#[test]
fn test_space_json_validates() {
    let json = r#"[{"name": "lr", "kind": "continuous", "min": 1.0, "max": 0.0}]"#;
    assert!(serde_json::from_str::<ParameterSpace>(json).is_err());
}
