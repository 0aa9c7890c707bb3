use normxcorr::{
    correlate, correlate_direct, BatchConfig, CorrelationError, CorrelationShape, ImageView,
    TemplateBank, DEFAULT_MIN_VAR,
};

#[test]
fn image_view_rejects_invalid_shapes() {
    let data = [0.0f32; 8];

    assert!(ImageView::from_slice(&data, 0).is_err());
    assert!(ImageView::from_slice(&data, 3).is_err());
    assert!(ImageView::new(&data, 4, 2, 3).is_err());
    assert_eq!(
        ImageView::new(&data, 4, 2, 5).unwrap_err(),
        CorrelationError::BufferSize { needed: 9, got: 8 }
    );
}

#[test]
fn template_bank_reports_shape() {
    let bank = TemplateBank::new(vec![0.0, 1.0, 0.0, 2.0, 4.0, 8.0], 3).unwrap();
    assert_eq!(bank.len(), 2);
    assert_eq!(bank.template_len(), 3);
    assert_eq!(bank.as_slice().len(), 6);
    assert_eq!(bank.norm_sums().len(), 2);
    assert!(bank.template(2).is_none());
}

#[test]
fn correlate_checks_output_size() {
    let bank = TemplateBank::new(vec![1.0, 2.0, 1.0, 0.0, 1.0, 0.0], 3).unwrap();
    let image = [0.0f32, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0];
    let mut out = vec![0.0f32; 7];
    assert_eq!(
        correlate(&bank, &image, 12, &mut out).unwrap_err(),
        CorrelationError::BufferSize { needed: 14, got: 7 }
    );
}

#[test]
fn shape_accepts_minimum_transform_length() {
    let shape = CorrelationShape::new(3, 1, 9, 9).unwrap();
    assert_eq!(shape.steps(), 7);

    // With fft_len == image_len the wraparound stays below the valid region.
    let bank = TemplateBank::new(vec![1.0, 2.0, 1.0], 3).unwrap();
    let image = [0.0f32, 1.0, 2.0, 1.0, 0.0, 3.0, -2.0, 1.0, 0.5];
    let mut tight = [0.0f32; 7];
    let mut padded = [0.0f32; 7];
    let mut direct = [0.0f32; 7];
    correlate(&bank, &image, 9, &mut tight).unwrap();
    correlate(&bank, &image, 16, &mut padded).unwrap();
    correlate_direct(&[1.0, 2.0, 1.0], &image, &mut direct).unwrap();
    for ((a, b), c) in tight.iter().zip(&padded).zip(&direct) {
        assert!((a - b).abs() < 1e-5);
        assert!((a - c).abs() < 1e-5);
    }
}

#[test]
fn batch_config_defaults() {
    let cfg = BatchConfig::default();
    assert_eq!(cfg.workers, None);
    assert_eq!(cfg.min_var, DEFAULT_MIN_VAR);
    let cfg = cfg.with_workers(2).with_min_var(1e-3);
    assert_eq!(cfg.resolved_workers(), 2);
    assert_eq!(cfg.min_var, 1e-3);
}

#[cfg(feature = "serde")]
#[test]
fn batch_config_loads_from_json() {
    let cfg: BatchConfig = serde_json::from_str(r#"{ "workers": 4 }"#).unwrap();
    assert_eq!(cfg.workers, Some(4));
    assert_eq!(cfg.min_var, DEFAULT_MIN_VAR);

    let cfg: BatchConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, BatchConfig::default());
}
