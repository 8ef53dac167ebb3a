//! Perturbed initial bounding boxes for training and evaluation sets.

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::progress::print_progress;
use crate::types::Shape;

/// Prefix of the landmark groups written by [`generate_perturbations_from_gt`].
pub const GENERATED_BB_PREFIX: &str = "__generated_bb_";

/// Attach `n_perturbations` perturbed bounding boxes to every image.
///
/// Each box is `perturb_func(gt_box, source_box)?.bounding_box()`, where
/// `gt_box` is the bounding box of the `gt_group` landmarks. Without
/// `bb_group_glob` the single source box is `gt_box` itself; with it, every
/// group matching the glob is a source box and is re-attached after its
/// perturbations. Boxes are stored as groups `__generated_bb_0`,
/// `__generated_bb_1`, ... and landmarks are clamped to the image bounds
/// afterwards.
///
/// Every image is checked before any is modified. Returns the accessor that
/// lists an image's generated boxes in order.
pub fn generate_perturbations_from_gt<F>(
    images: &mut [Image],
    n_perturbations: usize,
    mut perturb_func: F,
    gt_group: &str,
    bb_group_glob: Option<&str>,
    verbose: bool,
) -> Result<impl Fn(&Image) -> Vec<Shape>>
where
    F: FnMut(&Shape, &Shape) -> Result<Shape>,
{
    if let Some(image) = images.iter().find(|im| !im.landmarks.contains(gt_group)) {
        debug!(
            "generate: {}x{} image has no '{}' group",
            image.width(),
            image.height(),
            gt_group
        );
        return Err(Error::MissingLandmarkGroup(gt_group.to_string()));
    }

    let prefix = match bb_group_glob {
        Some(glob) => {
            let n_bbs = images
                .first()
                .map_or(0, |im| im.landmarks.items_matching(glob).count());
            if n_bbs == 0 && !images.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "must provide a valid bounding box glob - no bounding boxes matched the glob '{}'",
                    glob
                )));
            }
            format!(
                "- Generating {0} ({1} perturbations * {2} provided boxes) new initial bounding boxes + {2} provided boxes per image",
                n_perturbations * n_bbs,
                n_perturbations,
                n_bbs
            )
        }
        None => format!(
            "- Generating {} new bounding boxes directly from the ground truth shape",
            n_perturbations
        ),
    };

    for image in print_progress(images.iter_mut(), prefix, verbose) {
        let gt_box = image
            .landmarks
            .get(gt_group)
            .map(Shape::bounding_box)
            .ok_or_else(|| Error::MissingLandmarkGroup(gt_group.to_string()))?;

        let source_boxes: Vec<Shape> = match bb_group_glob {
            Some(glob) => image
                .landmarks
                .items_matching(glob)
                .map(|(_, shape)| shape.bounding_box())
                .collect(),
            None => vec![gt_box.clone()],
        };

        let mut k = 0;
        for bb in source_boxes {
            for _ in 0..n_perturbations {
                let perturbed = perturb_func(&gt_box, &bb)?.bounding_box();
                trace!("generate: {}{} = {:?}", GENERATED_BB_PREFIX, k, perturbed.bounds());
                image.landmarks.insert(format!("{}{}", GENERATED_BB_PREFIX, k), perturbed);
                k += 1;
            }
            if bb_group_glob.is_some() {
                image.landmarks.insert(format!("{}{}", GENERATED_BB_PREFIX, k), bb);
                k += 1;
            }
        }

        if image.has_landmarks_outside_bounds() {
            debug!("generate: clamping landmarks to {}x{}", image.width(), image.height());
            image.constrain_landmarks_to_bounds();
        }
    }

    Ok(generated_bounding_boxes)
}

/// The `__generated_bb_{k}` groups of `image`, ordered by `k`.
pub fn generated_bounding_boxes(image: &Image) -> Vec<Shape> {
    let mut boxes: Vec<(usize, &Shape)> = image
        .landmarks
        .items_matching("__generated_bb_*")
        .filter_map(|(name, shape)| {
            name[GENERATED_BB_PREFIX.len()..]
                .parse::<usize>()
                .ok()
                .map(|k| (k, shape))
        })
        .collect();
    boxes.sort_by_key(|(k, _)| *k);
    boxes.into_iter().map(|(_, shape)| shape.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::AffineTransform;
    use crate::types::{BoundingBox, Point};

    fn image_with_gt() -> Image {
        let mut image = Image::zeros(200, 150, 1).unwrap();
        image
            .landmarks
            .insert("gt", BoundingBox::new(50.0, 40.0, 60.0, 50.0).to_shape());
        image
    }

    fn shift(dx: f64) -> impl FnMut(&Shape, &Shape) -> Result<Shape> {
        move |_gt: &Shape, bb: &Shape| {
            Ok(AffineTransform::translation(Point::new(dx, 0.0)).apply(bb))
        }
    }

    #[test]
    fn attaches_n_groups_from_ground_truth() {
        let mut images = vec![image_with_gt(), image_with_gt()];
        let accessor =
            generate_perturbations_from_gt(&mut images, 3, shift(1.0), "gt", None, false).unwrap();

        for image in &images {
            let boxes = accessor(image);
            assert_eq!(boxes.len(), 3);
            assert_eq!(image.landmarks.len(), 4);
            assert_eq!(boxes[0].bounds_rect().x, 51.0);
        }
    }

    #[test]
    fn glob_boxes_are_perturbed_and_kept() {
        let mut image = image_with_gt();
        image
            .landmarks
            .insert("bb_detector", BoundingBox::new(45.0, 35.0, 70.0, 60.0).to_shape());
        image
            .landmarks
            .insert("bb_manual", BoundingBox::new(55.0, 45.0, 50.0, 40.0).to_shape());
        let mut images = vec![image];

        generate_perturbations_from_gt(&mut images, 4, shift(2.0), "gt", Some("bb_*"), true)
            .unwrap();

        let boxes = generated_bounding_boxes(&images[0]);
        assert_eq!(boxes.len(), 4 * 2 + 2);
        // each source box follows its perturbations
        assert_eq!(boxes[4].bounds_rect(), BoundingBox::new(45.0, 35.0, 70.0, 60.0));
        assert_eq!(boxes[9].bounds_rect(), BoundingBox::new(55.0, 45.0, 50.0, 40.0));
        assert_eq!(boxes[5].bounds_rect().x, 57.0);
    }

    #[test]
    fn unmatched_glob_leaves_images_untouched() {
        let mut images = vec![image_with_gt(), image_with_gt()];
        let before = images.clone();
        let err = generate_perturbations_from_gt(
            &mut images,
            2,
            shift(0.0),
            "gt",
            Some("detector_*"),
            false,
        )
        .err()
        .unwrap();

        match err {
            Error::InvalidArgument(msg) => assert!(msg.contains("detector_*")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(images, before);
    }

    #[test]
    fn missing_ground_truth_group() {
        let mut images = vec![image_with_gt(), Image::zeros(10, 10, 1).unwrap()];
        let before = images.clone();
        let err = generate_perturbations_from_gt(&mut images, 1, shift(0.0), "gt", None, false)
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingLandmarkGroup(g) if g == "gt"));
        assert_eq!(images, before);
    }

    #[test]
    fn landmarks_are_clamped_to_image() {
        let mut images = vec![image_with_gt()];
        generate_perturbations_from_gt(&mut images, 1, shift(500.0), "gt", None, false).unwrap();

        let boxes = generated_bounding_boxes(&images[0]);
        let rect = boxes[0].bounds_rect();
        assert_eq!(rect.x, 199.0);
        assert_eq!(rect.width, 0.0);
        assert!(!images[0].has_landmarks_outside_bounds());
    }

    #[test]
    fn accessor_orders_by_numeric_suffix() {
        let mut image = image_with_gt();
        for k in [10, 2, 0, 1] {
            image.landmarks.insert(
                format!("{}{}", GENERATED_BB_PREFIX, k),
                BoundingBox::new(k as f64, 0.0, 1.0, 1.0).to_shape(),
            );
        }
        let xs: Vec<f64> = generated_bounding_boxes(&image)
            .iter()
            .map(|b| b.bounds_rect().x)
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 10.0]);
    }

    #[test]
    fn perturbation_errors_propagate() {
        let mut images = vec![image_with_gt()];
        let failing = |_: &Shape, _: &Shape| -> Result<Shape> {
            Err(Error::DegenerateAlignment("collinear".into()))
        };
        let err = generate_perturbations_from_gt(&mut images, 1, failing, "gt", None, false)
            .err()
            .unwrap();
        assert!(matches!(err, Error::DegenerateAlignment(_)));
    }
}
