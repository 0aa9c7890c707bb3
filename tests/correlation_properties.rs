use normxcorr::{correlate, correlate_direct, correlate_direct_batch, fft_len_for, TemplateBank};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_signal(rng: &mut StdRng, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|_| rng.random_range(-amplitude..amplitude))
        .collect()
}

fn fft_correlate(bank: &TemplateBank, image: &[f32]) -> Vec<f32> {
    let steps = image.len() - bank.template_len() + 1;
    let mut out = vec![f32::NAN; bank.len() * steps];
    let fft_len = fft_len_for(bank.template_len(), image.len()).unwrap();
    correlate(bank, image, fft_len, &mut out).unwrap();
    out
}

#[test]
fn frequency_and_time_domain_agree() {
    let mut rng = StdRng::seed_from_u64(2024);
    let template_len = 50;
    let n_templates = 4;
    let raw = random_signal(&mut rng, template_len * n_templates, 1.0);
    let image = random_signal(&mut rng, 1_000, 2.0);
    let bank = TemplateBank::new(raw.clone(), template_len).unwrap();

    let fft = fft_correlate(&bank, &image);
    let steps = image.len() - template_len + 1;
    for t in 0..n_templates {
        let mut direct = vec![0.0f32; steps];
        correlate_direct(&raw[t * template_len..(t + 1) * template_len], &image, &mut direct)
            .unwrap();
        for (offset, (a, b)) in fft[t * steps..(t + 1) * steps]
            .iter()
            .zip(&direct)
            .enumerate()
        {
            assert!(
                (a - b).abs() < 1e-5,
                "template {t} offset {offset}: {a} vs {b}"
            );
        }
    }

    let mut batch = vec![0.0f32; n_templates * steps];
    correlate_direct_batch(&bank, &image, &mut batch).unwrap();
    for (a, b) in fft.iter().zip(&batch) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn embedded_template_scores_one() {
    let mut rng = StdRng::seed_from_u64(11);
    let template_len = 64;
    let mut image = random_signal(&mut rng, 2_000, 1.0);
    let template = random_signal(&mut rng, template_len, 3.0);
    let at = 777;
    image[at..at + template_len].copy_from_slice(&template);

    let bank = TemplateBank::new(template, template_len).unwrap();
    let out = fft_correlate(&bank, &image);
    assert!((out[at] - 1.0).abs() < 1e-5);

    let best = out
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(best, at);
    assert!(out.iter().all(|v| v.abs() <= 1.0 + 1e-5));
}

#[test]
fn flat_windows_score_exactly_zero() {
    let template_len = 4;
    let mut image: Vec<f32> = (0..40).map(|i| ((i * 13) % 7) as f32 - 3.0).collect();
    for v in &mut image[10..20] {
        *v = 2.5;
    }
    let bank = TemplateBank::new(vec![1.0, -1.0, 3.0, 0.5, 2.0, 2.0, -4.0, 1.0], template_len)
        .unwrap();
    let steps = image.len() - template_len + 1;

    let fft = fft_correlate(&bank, &image);
    let mut direct = vec![f32::NAN; steps];
    correlate_direct(&[1.0, -1.0, 3.0, 0.5], &image, &mut direct).unwrap();

    // Windows fully inside the flat run start at offsets 10..=16.
    for offset in 10..=16 {
        assert_eq!(fft[offset], 0.0);
        assert_eq!(fft[steps + offset], 0.0);
        assert_eq!(direct[offset], 0.0);
    }
    assert!(fft.iter().all(|v| v.is_finite()));
    assert!(direct.iter().all(|v| v.is_finite()));
}

#[test]
fn positive_image_scaling_keeps_coefficients() {
    let mut rng = StdRng::seed_from_u64(5);
    let template_len = 32;
    let bank = TemplateBank::new(random_signal(&mut rng, template_len * 2, 1.0), template_len)
        .unwrap();
    let image = random_signal(&mut rng, 600, 1.0);
    let scaled: Vec<f32> = image.iter().map(|v| v * 37.5).collect();

    let base = fft_correlate(&bank, &image);
    let other = fft_correlate(&bank, &scaled);
    for (a, b) in base.iter().zip(&other) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn short_pattern_peaks_at_matching_shapes() {
    let bank = TemplateBank::new(vec![1.0, 2.0, 1.0], 3).unwrap();
    let image = [0.0f32, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0];
    let mut out = [f32::NAN; 7];
    correlate(&bank, &image, 12, &mut out).unwrap();

    assert!((out[1] - 1.0).abs() < 1e-5);
    assert!((out[5] - 1.0).abs() < 1e-5);
    assert!(out[1] > out[0] && out[1] > out[2]);
    assert!(out[5] > out[4] && out[5] > out[6]);
    // [1, 0, 1] is the inverted shape.
    assert!((out[3] + 1.0).abs() < 1e-5);
}

#[test]
fn large_offset_images_stay_accurate() {
    // A large DC level stresses the running variance; accumulation is f64.
    let mut rng = StdRng::seed_from_u64(99);
    let template_len = 100;
    let raw = random_signal(&mut rng, template_len, 1.0);
    let image: Vec<f32> = random_signal(&mut rng, 20_000, 50.0)
        .into_iter()
        .map(|v| v + 1.0e3)
        .collect();
    let bank = TemplateBank::new(raw.clone(), template_len).unwrap();

    let fft = fft_correlate(&bank, &image);
    let mut direct = vec![0.0f32; image.len() - template_len + 1];
    correlate_direct(&raw, &image, &mut direct).unwrap();
    for (a, b) in fft.iter().zip(&direct) {
        assert!((a - b).abs() < 1e-4);
    }
}
