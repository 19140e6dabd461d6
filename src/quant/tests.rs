//! Tests for weight quantization parameters.

use super::*;
use crate::error::TrazarError;
use crate::Tensor;
use approx::assert_abs_diff_eq;
use proptest::prelude::*;

fn tensor(values: &[f32], shape: &[usize]) -> Tensor {
    Tensor::from_vec(values.to_vec(), shape.to_vec()).unwrap()
}

// ========================================================================
// Parameter records
// ========================================================================

#[test]
fn test_default_params() {
    let params = WeightQuantParams::default();
    assert_eq!(params.scheme, QuantScheme::PerTensorAffine);
    assert_eq!(params.dtype, QuantDtype::QUint8);
    assert_eq!(params.scales, vec![1.0]);
    assert_eq!(params.zero_points, vec![0]);
    assert_eq!(params.axis, 0);
}

#[test]
fn test_per_channel_rejects_per_tensor_scheme() {
    let err = WeightQuantParams::per_channel(
        QuantScheme::PerTensorAffine,
        vec![1.0],
        vec![0],
        0,
        QuantDtype::QInt8,
    )
    .unwrap_err();
    assert!(matches!(err, TrazarError::UnsupportedScheme { .. }));
}

#[test]
fn test_validate_per_tensor_needs_one_pair() {
    let mut params = WeightQuantParams::default();
    params.scales = vec![1.0, 2.0];
    let err = params.validate(&[4]).unwrap_err();
    assert!(matches!(err, TrazarError::QParamLengthMismatch { expected: 1, .. }));
}

#[test]
fn test_validate_per_channel_cardinality() {
    // 3 channels along axis 0, but only 2 parameter pairs.
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1, 0.2],
        vec![0, 0],
        0,
        QuantDtype::QInt8,
    )
    .unwrap();
    let err = params.validate(&[3, 4]).unwrap_err();
    assert!(matches!(
        err,
        TrazarError::QParamLengthMismatch { axis: 0, expected: 3, scales: 2, zero_points: 2 }
    ));
}

#[test]
fn test_validate_axis_out_of_range() {
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1],
        vec![0],
        2,
        QuantDtype::QInt8,
    )
    .unwrap();
    let err = params.validate(&[3, 4]).unwrap_err();
    assert!(matches!(err, TrazarError::AxisOutOfRange { axis: 2, ndim: 2 }));
}

#[test]
fn test_validate_none_always_ok() {
    WeightQuantParams::none().validate(&[3, 4]).unwrap();
}

// ========================================================================
// Quantize / dequantize
// ========================================================================

#[test]
fn test_per_tensor_quint8_codes() {
    let w = tensor(&[0.0, 0.1, 0.25, -0.3], &[4]);
    let params = WeightQuantParams::per_tensor(0.1, 128, QuantDtype::QUint8);

    let q = quantize_weight(&w, &params).unwrap();
    match q.repr() {
        QuantizedRepr::QUint8(codes) => assert_eq!(codes, &vec![128, 129, 131, 125]),
        other => panic!("expected quint8 codes, got {other:?}"),
    }

    let d = q.dequantize();
    assert_abs_diff_eq!(d.data()[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(d.data()[1], 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(d.data()[2], 0.3, epsilon = 1e-6); // 0.25 rounds away from zero
    assert_abs_diff_eq!(d.data()[3], -0.3, epsilon = 1e-6);
}

#[test]
fn test_per_tensor_quint8_clamps_to_range() {
    let w = tensor(&[-100.0, 100.0], &[2]);
    let params = WeightQuantParams::per_tensor(0.1, 0, QuantDtype::QUint8);

    let q = quantize_weight(&w, &params).unwrap();
    match q.repr() {
        QuantizedRepr::QUint8(codes) => assert_eq!(codes, &vec![0, 255]),
        other => panic!("expected quint8 codes, got {other:?}"),
    }
}

#[test]
fn test_per_tensor_qint8() {
    let w = tensor(&[-1.0, -0.5, 0.0, 0.5, 1.0], &[5]);
    let params = WeightQuantParams::per_tensor(0.05, 0, QuantDtype::QInt8);

    let q = quantize_weight(&w, &params).unwrap();
    match q.repr() {
        QuantizedRepr::QInt8(codes) => assert_eq!(codes, &vec![-20, -10, 0, 10, 20]),
        other => panic!("expected qint8 codes, got {other:?}"),
    }

    let d = q.dequantize();
    for (orig, deq) in w.data().iter().zip(d.data().iter()) {
        assert_abs_diff_eq!(orig, deq, epsilon = 1e-6);
    }
}

#[test]
fn test_per_tensor_fp16_is_a_cast() {
    let w = tensor(&[0.1, -2.5, 65504.0], &[3]);
    let params = WeightQuantParams::per_tensor(1.0, 0, QuantDtype::Fp16);

    let q = quantize_weight(&w, &params).unwrap();
    let expected: Vec<half::f16> = w.data().iter().map(|&x| half::f16::from_f32(x)).collect();
    match q.repr() {
        QuantizedRepr::Fp16(halves) => assert_eq!(halves, &expected),
        other => panic!("expected fp16 values, got {other:?}"),
    }

    let d = q.dequantize();
    for (h, deq) in expected.iter().zip(d.data().iter()) {
        assert_eq!(h.to_f32(), *deq);
    }
}

#[test]
fn test_per_tensor_bf16_unsupported() {
    let w = tensor(&[1.0], &[1]);
    let params = WeightQuantParams::per_tensor(1.0, 0, QuantDtype::Bf16);
    let err = quantize_weight(&w, &params).unwrap_err();
    assert!(matches!(
        err,
        TrazarError::UnsupportedDtype { dtype: QuantDtype::Bf16, scheme: QuantScheme::PerTensorAffine }
    ));
}

#[test]
fn test_scheme_none_cannot_quantize() {
    let w = tensor(&[1.0], &[1]);
    let err = quantize_weight(&w, &WeightQuantParams::none()).unwrap_err();
    assert!(matches!(err, TrazarError::UnsupportedScheme { scheme: QuantScheme::None, .. }));
}

#[test]
fn test_per_channel_fp16_unsupported() {
    let w = tensor(&[1.0, 2.0], &[2, 1]);
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![1.0, 1.0],
        vec![0, 0],
        0,
        QuantDtype::Fp16,
    )
    .unwrap();
    let err = quantize_weight(&w, &params).unwrap_err();
    assert!(matches!(err, TrazarError::UnsupportedDtype { dtype: QuantDtype::Fp16, .. }));
}

#[test]
fn test_per_channel_axis0() {
    // Row 0 fine-grained, row 1 coarse with an offset zero point.
    let w = tensor(&[0.05, -0.05, 0.2, 1.0, 2.0, -3.0], &[2, 3]);
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1, 1.0],
        vec![0, 10],
        0,
        QuantDtype::QUint8,
    )
    .unwrap();

    let q = quantize_weight(&w, &params).unwrap();
    match q.repr() {
        QuantizedRepr::QUint8(codes) => assert_eq!(codes, &vec![1, 0, 2, 11, 12, 7]),
        other => panic!("expected quint8 codes, got {other:?}"),
    }

    let d = q.dequantize();
    let expected = [0.1, 0.0, 0.2, 1.0, 2.0, -3.0];
    for (exp, deq) in expected.iter().zip(d.data().iter()) {
        assert_abs_diff_eq!(exp, deq, epsilon = 1e-6);
    }
}

#[test]
fn test_per_channel_axis1() {
    let w = tensor(&[0.1, 1.0, -0.2, -2.0], &[2, 2]);
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffineFloatParams,
        vec![0.1, 1.0],
        vec![0, 0],
        1,
        QuantDtype::QInt8,
    )
    .unwrap();

    let q = quantize_weight(&w, &params).unwrap();
    match q.repr() {
        QuantizedRepr::QInt8(codes) => assert_eq!(codes, &vec![1, 1, -2, -2]),
        other => panic!("expected qint8 codes, got {other:?}"),
    }

    let d = q.dequantize();
    for (orig, deq) in w.data().iter().zip(d.data().iter()) {
        assert_abs_diff_eq!(orig, deq, epsilon = 1e-6);
    }
}

#[test]
fn test_per_channel_length_mismatch_fails_before_math() {
    let w = tensor(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1],
        vec![0],
        0,
        QuantDtype::QInt8,
    )
    .unwrap();
    let err = quantize_weight(&w, &params).unwrap_err();
    assert!(matches!(err, TrazarError::QParamLengthMismatch { .. }));
}

#[test]
fn test_quantized_weight_metadata() {
    let w = tensor(&[1.0; 100], &[10, 10]);
    let params = WeightQuantParams::per_tensor(0.1, 0, QuantDtype::QUint8);
    let q = quantize_weight(&w, &params).unwrap();

    assert_eq!(q.shape(), &[10, 10]);
    assert_eq!(q.qparams(), &params);
    // 100 code bytes + 4 scale bytes + 4 zero-point bytes.
    assert_eq!(q.memory_bytes(), 108);
}

// ========================================================================
// Fake quantization
// ========================================================================

#[test]
fn test_fake_quantize_equals_quantize_then_dequantize() {
    let w = tensor(&[0.17, -0.42, 0.93, -1.6], &[4]);
    for params in [
        WeightQuantParams::per_tensor(0.05, 12, QuantDtype::QUint8),
        WeightQuantParams::per_tensor(0.05, 0, QuantDtype::QInt8),
        WeightQuantParams::per_tensor(1.0, 0, QuantDtype::Fp16),
        WeightQuantParams::per_channel(
            QuantScheme::PerChannelAffine,
            vec![0.1, 0.2, 0.3, 0.4],
            vec![1, 2, 3, 4],
            0,
            QuantDtype::QUint8,
        )
        .unwrap(),
    ] {
        let direct = quantize_weight(&w, &params).unwrap().dequantize();
        let faked = fake_quantize_weight(&w, &params).unwrap();
        assert_eq!(direct, faked, "scheme {} dtype {}", params.scheme, params.dtype);
    }
}

#[test]
fn test_fake_quantize_none_is_identity() {
    let w = Tensor::new(ndarray::arr1(&[0.1, 0.2, 0.3]), vec![3], true).unwrap();
    let out = fake_quantize_weight(&w, &WeightQuantParams::none()).unwrap();
    assert_eq!(out, w);
}

// ========================================================================
// State-dict round trip
// ========================================================================

#[test]
fn test_save_none_writes_scheme_and_dtype_only() {
    let mut state = StateDict::new();
    save_weight_qparams(&mut state, "fc.", &WeightQuantParams::none());

    assert_eq!(state.len(), 2);
    assert_eq!(state.get("fc.weight_qscheme"), Some(&StateValue::Scheme(QuantScheme::None)));
    assert!(state.contains_key("fc.weight_dtype"));
}

#[test]
fn test_save_per_tensor_writes_scale_and_zero_point() {
    let mut state = StateDict::new();
    save_weight_qparams(&mut state, "fc.", &WeightQuantParams::default());

    assert_eq!(state.len(), 4);
    assert_eq!(state.get("fc.weight_scale"), Some(&StateValue::F32List(vec![1.0])));
    assert_eq!(state.get("fc.weight_zero_point"), Some(&StateValue::I32List(vec![0])));
    assert!(!state.contains_key("fc.weight_axis"));
}

#[test]
fn test_save_per_channel_writes_axis_for_both_variants() {
    for scheme in [QuantScheme::PerChannelAffine, QuantScheme::PerChannelAffineFloatParams] {
        let params = WeightQuantParams::per_channel(
            scheme,
            vec![0.1, 0.2],
            vec![1, 2],
            1,
            QuantDtype::QInt8,
        )
        .unwrap();
        let mut state = StateDict::new();
        save_weight_qparams(&mut state, "conv.", &params);

        assert_eq!(state.len(), 5, "scheme {scheme}");
        assert_eq!(state.get("conv.weight_axis"), Some(&StateValue::USize(1)));
    }
}

#[test]
fn test_round_trip_every_scheme() {
    let records = [
        WeightQuantParams::none(),
        WeightQuantParams::per_tensor(0.25, 100, QuantDtype::QUint8),
        WeightQuantParams::per_tensor(1.0, 0, QuantDtype::Fp16),
        WeightQuantParams::per_channel(
            QuantScheme::PerChannelAffine,
            vec![0.1, 0.2, 0.3],
            vec![1, 2, 3],
            0,
            QuantDtype::QInt8,
        )
        .unwrap(),
        WeightQuantParams::per_channel(
            QuantScheme::PerChannelAffineFloatParams,
            vec![0.5, 0.6],
            vec![10, 20],
            1,
            QuantDtype::QUint8,
        )
        .unwrap(),
    ];

    for params in records {
        let mut state = StateDict::new();
        state.insert("unrelated".to_string(), StateValue::USize(7));
        save_weight_qparams(&mut state, "layer.", &params);

        let loaded = load_weight_qparams(&mut state, "layer.").unwrap();
        assert_eq!(loaded, params);

        // Consumed keys are removed; unrelated entries survive.
        assert_eq!(state.len(), 1);
        assert!(state.contains_key("unrelated"));
    }
}

#[test]
fn test_qparam_keys_follow_the_scheme() {
    let mut state = StateDict::new();
    save_weight_qparams(&mut state, "", &WeightQuantParams::default());
    let keys = weight_qparam_keys(&state, "").unwrap();
    assert_eq!(
        keys,
        vec!["weight_qscheme", "weight_dtype", "weight_scale", "weight_zero_point"]
    );

    let mut state = StateDict::new();
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffineFloatParams,
        vec![0.1],
        vec![0],
        0,
        QuantDtype::QInt8,
    )
    .unwrap();
    save_weight_qparams(&mut state, "", &params);
    let keys = weight_qparam_keys(&state, "").unwrap();
    assert!(keys.contains(&"weight_axis".to_string()));
}

#[test]
fn test_load_missing_scale_fails_and_preserves_map() {
    let mut state = StateDict::new();
    save_weight_qparams(&mut state, "fc.", &WeightQuantParams::default());
    state.remove("fc.weight_scale");
    let before = state.clone();

    let err = load_weight_qparams(&mut state, "fc.").unwrap_err();
    assert!(matches!(err, TrazarError::MissingState { ref key } if key == "fc.weight_scale"));
    assert_eq!(state, before);
}

#[test]
fn test_load_wrong_kind_is_malformed_state() {
    let mut state = StateDict::new();
    save_weight_qparams(&mut state, "fc.", &WeightQuantParams::default());
    state.insert("fc.weight_qscheme".to_string(), StateValue::USize(3));

    let err = load_weight_qparams(&mut state, "fc.").unwrap_err();
    assert!(matches!(err, TrazarError::MissingState { ref key } if key == "fc.weight_qscheme"));
}

#[test]
fn test_state_value_serde_round_trip() {
    let mut state = StateDict::new();
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.25, 0.5],
        vec![3, 4],
        0,
        QuantDtype::QUint8,
    )
    .unwrap();
    save_weight_qparams(&mut state, "conv.", &params);

    let json = serde_json::to_string(&state).unwrap();
    let mut restored: StateDict = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);

    let loaded = load_weight_qparams(&mut restored, "conv.").unwrap();
    assert_eq!(loaded, params);
}

// ========================================================================
// WeightQuantizer
// ========================================================================

#[test]
fn test_quantizer_defaults_when_no_params_given() {
    let q = WeightQuantizer::new(tensor(&[1.0, 2.0], &[2]), None).unwrap();
    assert_eq!(q.qparams(), &WeightQuantParams::default());
}

#[test]
fn test_quantizer_rejects_mismatched_params() {
    let params = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1, 0.2, 0.3],
        vec![0, 0, 0],
        0,
        QuantDtype::QInt8,
    )
    .unwrap();
    let err = WeightQuantizer::new(tensor(&[1.0, 2.0], &[2, 1]), Some(params)).unwrap_err();
    assert!(matches!(err, TrazarError::QParamLengthMismatch { .. }));
}

#[test]
fn test_quantizer_views_agree() {
    let params = WeightQuantParams::per_tensor(0.02, 50, QuantDtype::QUint8);
    let q = WeightQuantizer::new(tensor(&[0.3, -0.7, 0.01], &[3]), Some(params)).unwrap();

    let simulated = q.simulated_weight().unwrap();
    let dequantized = q.quantized_weight().unwrap().dequantize();
    assert_eq!(simulated, dequantized);
    // The source weight is untouched.
    assert_eq!(q.weight().data().to_vec(), vec![0.3, -0.7, 0.01]);
}

#[test]
fn test_quantizer_state_round_trip_overwrites_all_fields() {
    let weight = tensor(&[0.1, 0.2, 0.3, 0.4], &[2, 2]);
    let saved = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1, 0.2],
        vec![1, 2],
        0,
        QuantDtype::QInt8,
    )
    .unwrap();

    let mut state = StateDict::new();
    let source = WeightQuantizer::new(weight.clone(), Some(saved.clone())).unwrap();
    source.save_state(&mut state, "fc.");

    let mut restored = WeightQuantizer::new(weight, None).unwrap();
    restored.load_state(&mut state, "fc.").unwrap();
    assert_eq!(restored.qparams(), &saved);
    assert!(state.is_empty());
}

#[test]
fn test_quantizer_load_is_atomic_on_missing_key() {
    let weight = tensor(&[0.1, 0.2], &[2]);
    let mut q = WeightQuantizer::new(weight, None).unwrap();
    let original = q.qparams().clone();

    let mut state = StateDict::new();
    state.insert(
        "fc.weight_qscheme".to_string(),
        StateValue::Scheme(QuantScheme::PerTensorAffine),
    );
    // weight_dtype and the rest are absent.
    let before = state.clone();

    assert!(q.load_state(&mut state, "fc.").is_err());
    assert_eq!(q.qparams(), &original);
    assert_eq!(state, before);
}

#[test]
fn test_quantizer_load_is_atomic_on_invalid_record() {
    // A record that parses but does not fit this weight's shape.
    let weight = tensor(&[0.1, 0.2], &[2, 1]);
    let mut q = WeightQuantizer::new(weight, None).unwrap();
    let original = q.qparams().clone();

    let bad = WeightQuantParams::per_channel(
        QuantScheme::PerChannelAffine,
        vec![0.1, 0.2, 0.3],
        vec![0, 0, 0],
        0,
        QuantDtype::QInt8,
    )
    .unwrap();
    let mut state = StateDict::new();
    save_weight_qparams(&mut state, "fc.", &bad);
    let before = state.clone();

    assert!(q.load_state(&mut state, "fc.").is_err());
    assert_eq!(q.qparams(), &original);
    assert_eq!(state, before);
}

// ========================================================================
// Property tests
// ========================================================================

fn arb_scheme() -> impl Strategy<Value = QuantScheme> {
    prop_oneof![
        Just(QuantScheme::None),
        Just(QuantScheme::PerTensorAffine),
        Just(QuantScheme::PerChannelAffine),
        Just(QuantScheme::PerChannelAffineFloatParams),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_dequantize_matches_fake_quantize(
        values in prop::collection::vec(-50.0f32..50.0, 1..64),
        scale in 0.001f32..1.0,
        zero_point in 0i32..=255,
    ) {
        let w = tensor(&values, &[values.len()]);
        let params = WeightQuantParams::per_tensor(scale, zero_point, QuantDtype::QUint8);

        let direct = quantize_weight(&w, &params).unwrap().dequantize();
        let faked = fake_quantize_weight(&w, &params).unwrap();
        prop_assert_eq!(direct, faked);
    }

    #[test]
    fn prop_fake_quantize_is_idempotent(
        values in prop::collection::vec(-50.0f32..50.0, 1..64),
        scale in 0.001f32..10.0,
    ) {
        let w = tensor(&values, &[values.len()]);
        let params = WeightQuantParams::per_tensor(scale, 0, QuantDtype::QInt8);

        let once = fake_quantize_weight(&w, &params).unwrap();
        let twice = fake_quantize_weight(&once, &params).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_round_trip_error_bounded_by_half_scale(
        values in prop::collection::vec(-1.0f32..1.0, 1..64),
        scale in 0.01f32..0.1,
    ) {
        // With zero point 0 and values within the representable range,
        // quantization error never exceeds half a step.
        let w = tensor(&values, &[values.len()]);
        let params = WeightQuantParams::per_tensor(scale, 0, QuantDtype::QInt8);

        let restored = fake_quantize_weight(&w, &params).unwrap();
        for (orig, deq) in w.data().iter().zip(restored.data().iter()) {
            prop_assert!((orig - deq).abs() <= scale * 0.5 + 1e-6);
        }
    }

    #[test]
    fn prop_state_round_trip_any_scheme(
        scheme in arb_scheme(),
        channels in 1usize..8,
        axis in 0usize..2,
    ) {
        let params = match scheme {
            QuantScheme::None => WeightQuantParams::none(),
            QuantScheme::PerTensorAffine => {
                WeightQuantParams::per_tensor(0.5, 1, QuantDtype::QInt8)
            }
            _ => WeightQuantParams::per_channel(
                scheme,
                vec![0.1; channels],
                vec![1; channels],
                axis,
                QuantDtype::QUint8,
            )
            .unwrap(),
        };

        let mut state = StateDict::new();
        save_weight_qparams(&mut state, "m.", &params);
        let loaded = load_weight_qparams(&mut state, "m.").unwrap();
        prop_assert_eq!(loaded, params);
        prop_assert!(state.is_empty());
    }

    #[test]
    fn prop_per_channel_code_count_matches_input(
        rows in 1usize..6,
        cols in 1usize..6,
    ) {
        let values: Vec<f32> = (0..rows * cols).map(|i| i as f32 * 0.1).collect();
        let w = tensor(&values, &[rows, cols]);
        let params = WeightQuantParams::per_channel(
            QuantScheme::PerChannelAffine,
            vec![0.1; rows],
            vec![0; rows],
            0,
            QuantDtype::QInt8,
        )
        .unwrap();

        let q = quantize_weight(&w, &params).unwrap();
        prop_assert_eq!(q.repr().len(), rows * cols);
    }
}
