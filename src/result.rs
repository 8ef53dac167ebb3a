use crate::algorithm::AlgorithmResult;
use crate::image::Image;
use crate::transform::AffineTransform;
use crate::types::Shape;

/// Packaged output of a multi-scale fit.
///
/// Each [`AlgorithmResult`] lives in the frame of its own pyramid level. A
/// shape from scale `j` is brought back to the original image by scaling it
/// by `scales[last] / scales[j]` (into the finest level's frame) and then
/// applying the affine correction.
#[derive(Debug, Clone)]
pub struct MultiScaleResult {
    image: Image,
    algorithm_results: Vec<AlgorithmResult>,
    scales: Vec<f64>,
    affine_correction: AffineTransform,
    initial_shape: Shape,
    gt_shape: Option<Shape>,
}

impl MultiScaleResult {
    pub fn new(
        image: Image,
        algorithm_results: Vec<AlgorithmResult>,
        scales: Vec<f64>,
        affine_correction: AffineTransform,
        initial_shape: Shape,
        gt_shape: Option<Shape>,
    ) -> Self {
        debug_assert_eq!(algorithm_results.len(), scales.len());
        Self {
            image,
            algorithm_results,
            scales,
            affine_correction,
            initial_shape,
            gt_shape,
        }
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn n_scales(&self) -> usize {
        self.algorithm_results.len()
    }

    /// Per-scale results, coarse to fine.
    pub fn algorithm_results(&self) -> &[AlgorithmResult] {
        &self.algorithm_results
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn affine_correction(&self) -> &AffineTransform {
        &self.affine_correction
    }

    pub fn gt_shape(&self) -> Option<&Shape> {
        self.gt_shape.as_ref()
    }

    /// The initial shape in original image coordinates.
    pub fn initial_shape(&self) -> &Shape {
        &self.initial_shape
    }

    /// Map a shape expressed in scale `j`'s frame to original image coordinates.
    pub(crate) fn to_original(&self, scale_index: usize, shape: &Shape) -> Shape {
        let last = self.scales.len() - 1;
        let ratio = self.scales[last] / self.scales[scale_index];
        self.affine_correction
            .compose_after(&AffineTransform::scale(ratio))
            .apply(shape)
    }

    pub fn final_shape(&self) -> Shape {
        match self.algorithm_results.last() {
            Some(result) => self.to_original(self.n_scales() - 1, result.final_shape()),
            None => self.initial_shape.clone(),
        }
    }

    /// Initial shape followed by every iteration of every scale, all in
    /// original image coordinates.
    pub fn shapes(&self) -> Vec<Shape> {
        let mut out = vec![self.initial_shape.clone()];
        for (j, result) in self.algorithm_results.iter().enumerate() {
            out.extend(result.shapes().iter().map(|s| self.to_original(j, s)));
        }
        out
    }

    pub fn n_iters(&self) -> usize {
        self.algorithm_results.iter().map(|r| r.n_iters()).sum()
    }

    pub fn initial_error(&self) -> Option<f64> {
        self.gt_shape
            .as_ref()
            .map(|gt| self.initial_shape.mean_distance(gt))
    }

    pub fn final_error(&self) -> Option<f64> {
        self.gt_shape
            .as_ref()
            .map(|gt| self.final_shape().mean_distance(gt))
    }

    /// Error of every entry of [`shapes`](Self::shapes) against the ground truth.
    pub fn errors(&self) -> Option<Vec<f64>> {
        let gt = self.gt_shape.as_ref()?;
        Some(self.shapes().iter().map(|s| s.mean_distance(gt)).collect())
    }
}
