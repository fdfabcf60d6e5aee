use super::*;

mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        /// Continuous parameters should always sample within bounds.
        #[test]
        fn prop_continuous_within_bounds(
            low in -1000.0_f64..1000.0,
            high_offset in 0.0_f64..1000.0,
            seed in any::<u64>()
        ) {
            let high = low + high_offset;
            let spec = HyperparameterSpec::continuous("x", low, high);
            let mut rng = StdRng::seed_from_u64(seed);

            for _ in 0..100 {
                let v = spec.sample(&mut rng);
                prop_assert!(spec.contains(&v), "Value {} not in [{}, {}]", v, low, high);
            }
        }

        /// Integer parameters should always sample within bounds.
        #[test]
        fn prop_integer_within_bounds(
            low in -500_i64..500,
            span in 0_i64..500,
            seed in any::<u64>()
        ) {
            let spec = HyperparameterSpec::integer("n", low, low + span);
            let mut rng = StdRng::seed_from_u64(seed);

            for _ in 0..100 {
                let v = spec.sample(&mut rng);
                prop_assert!(spec.contains(&v), "Value {} not in [{}, {}]", v, low, low + span);
            }
        }

        /// Clamping any value lands inside the bounds.
        #[test]
        fn prop_clamp_is_in_bounds(
            low in -10.0_f64..10.0,
            span in 0.0_f64..10.0,
            value in -100.0_f64..100.0
        ) {
            let spec = HyperparameterSpec::continuous("x", low, low + span);
            prop_assert!(spec.contains(&spec.clamp(ParamValue::Float(value))));
        }

        /// Clamping an in-bounds value is the identity.
        #[test]
        fn prop_clamp_keeps_in_bounds_values(low in -100_i64..100, span in 0_i64..100, offset in 0_i64..100) {
            let spec = HyperparameterSpec::integer("n", low, low + span);
            let v = low + offset.min(span);
            prop_assert_eq!(spec.clamp(ParamValue::Int(v)), ParamValue::Int(v));
        }
    }
}
