//! Statistical and end-to-end checks of the perturbation utilities and the
//! perturbation-set generator.

use approx::assert_abs_diff_eq;
use percent_fit::{
    bounding_box_perturbation, generate_perturbations_from_gt, generated_bounding_boxes,
    noisy_shape_from_bounding_box, BoundingBox, Error, Image, NoiseType, PerturbOptions, Shape,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn gt_box() -> Shape {
    BoundingBox::new(60.0, 40.0, 100.0, 120.0).to_shape()
}

fn width_ratios(options: PerturbOptions, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let gt = gt_box();
    (0..n)
        .map(|_| {
            let noisy = noisy_shape_from_bounding_box(&gt, &gt, &options, &mut rng).unwrap();
            noisy.bounds_rect().width / 100.0
        })
        .collect()
}

#[test]
fn uniform_scale_noise_stays_in_range() {
    let ratios = width_ratios(PerturbOptions::new(NoiseType::Uniform, [0.2, 0.0, 0.0]), 500, 1);
    for r in &ratios {
        assert!((0.9 - 1e-9..=1.1 + 1e-9).contains(r), "ratio {} out of range", r);
    }
    // both halves of the range are visited
    assert!(ratios.iter().any(|&r| r < 0.95));
    assert!(ratios.iter().any(|&r| r > 1.05));
}

#[test]
fn gaussian_scale_noise_statistics() {
    let ratios = width_ratios(PerturbOptions::new(NoiseType::Gaussian, [0.3, 0.0, 0.0]), 4000, 2);
    let n = ratios.len() as f64;
    let mean = ratios.iter().sum::<f64>() / n;
    let var = ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    assert_abs_diff_eq!(mean, 1.0, epsilon = 0.01);
    // std of the relative scale is pct * 0.5 / 3
    assert_abs_diff_eq!(var.sqrt(), 0.05, epsilon = 0.005);
}

#[test]
fn uniform_translation_noise_is_bounded_by_range() {
    let options = PerturbOptions::new(NoiseType::Uniform, [0.0, 0.0, 0.1]);
    let mut rng = StdRng::seed_from_u64(3);
    let gt = gt_box();
    let centre = gt.centroid();
    for _ in 0..500 {
        let noisy = noisy_shape_from_bounding_box(&gt, &gt, &options, &mut rng).unwrap();
        let shift = noisy.centroid() - centre;
        assert!(shift.x.abs() <= 10.0 + 1e-9);
        assert!(shift.y.abs() <= 12.0 + 1e-9);
        assert_abs_diff_eq!(noisy.bounds_rect().width, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn generator_is_reproducible_with_a_seed() {
    init_logging();
    let make_images = || {
        (0..3)
            .map(|i| {
                let mut image = Image::zeros(240, 240, 1).unwrap();
                let gt = BoundingBox::new(40.0 + 10.0 * i as f64, 50.0, 90.0, 100.0).to_shape();
                image.landmarks.insert("gt", gt);
                image
            })
            .collect::<Vec<_>>()
    };
    let options = PerturbOptions::new(NoiseType::Gaussian, [0.04, 0.02, 0.04]);

    let run = |seed: u64| {
        let mut images = make_images();
        let mut rng = StdRng::seed_from_u64(seed);
        generate_perturbations_from_gt(
            &mut images,
            6,
            bounding_box_perturbation(options, &mut rng),
            "gt",
            None,
            true,
        )
        .unwrap();
        images
    };

    let first = run(11);
    let second = run(11);
    let other = run(12);

    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(generated_bounding_boxes(a), generated_bounding_boxes(b));
        assert_eq!(generated_bounding_boxes(a).len(), 6);
    }
    assert_ne!(
        generated_bounding_boxes(&first[0]),
        generated_bounding_boxes(&other[0])
    );
}

#[test]
fn generator_with_detector_boxes() {
    init_logging();
    let mut images: Vec<Image> = (0..2)
        .map(|_| {
            let mut image = Image::zeros(200, 200, 1).unwrap();
            image
                .landmarks
                .insert("gt", BoundingBox::new(50.0, 50.0, 80.0, 80.0).to_shape());
            image
                .landmarks
                .insert("det_a", BoundingBox::new(48.0, 52.0, 84.0, 76.0).to_shape());
            image
                .landmarks
                .insert("det_b", BoundingBox::new(55.0, 45.0, 70.0, 90.0).to_shape());
            image
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(5);
    let accessor = generate_perturbations_from_gt(
        &mut images,
        3,
        bounding_box_perturbation(PerturbOptions::default(), &mut rng),
        "gt",
        Some("det_?"),
        false,
    )
    .unwrap();

    for image in &images {
        let boxes = accessor(image);
        assert_eq!(boxes.len(), 3 * 2 + 2);
        assert_eq!(boxes[3], image.landmarks.get("det_a").unwrap().bounding_box());
        assert_eq!(boxes[7], image.landmarks.get("det_b").unwrap().bounding_box());
    }
}

#[test]
fn generator_rejects_unmatched_glob() {
    let mut image = Image::zeros(100, 100, 1).unwrap();
    image
        .landmarks
        .insert("gt", BoundingBox::new(10.0, 10.0, 50.0, 50.0).to_shape());
    let mut images = vec![image];
    let mut rng = StdRng::seed_from_u64(0);

    let result = generate_perturbations_from_gt(
        &mut images,
        3,
        bounding_box_perturbation(PerturbOptions::default(), &mut rng),
        "gt",
        Some("face_detector"),
        false,
    );
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(images[0].landmarks.len(), 1);
}
