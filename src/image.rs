//! Multi-channel floating point images with attached landmark groups.
//!
//! Every geometric operation (crop, rescale) returns the new image together
//! with the [`AffineTransform`] that maps coordinates of the source image to
//! coordinates of the result. Landmark groups attached to the source are
//! migrated through the same transform.

use crate::align::align_uniform_scale;
use crate::error::{Error, Result};
use crate::landmarks::LandmarkGroups;
use crate::transform::AffineTransform;
use crate::types::{Point, Shape};

/// Largest number of samples a resampled image may hold.
const MAX_SAMPLES: usize = 1 << 28;

/// A `width × height × n_channels` grid of `f32` samples, row-major with
/// interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    n_channels: usize,
    pixels: Vec<f32>,
    pub landmarks: LandmarkGroups,
}

impl Image {
    pub fn new(width: usize, height: usize, n_channels: usize, pixels: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { width, height });
        }
        if n_channels == 0 {
            return Err(Error::InvalidArgument(
                "image must have at least one channel".into(),
            ));
        }
        if pixels.len() != width * height * n_channels {
            return Err(Error::InvalidArgument(format!(
                "expected {} samples for a {}x{}x{} image, got {}",
                width * height * n_channels,
                width,
                height,
                n_channels,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            n_channels,
            pixels,
            landmarks: LandmarkGroups::new(),
        })
    }

    pub fn zeros(width: usize, height: usize, n_channels: usize) -> Result<Self> {
        Self::new(width, height, n_channels, vec![0.0; width * height * n_channels])
    }

    /// Single-channel image from a per-pixel function.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, 1, data)
    }

    /// Grayscale image with intensities mapped to `[0, 1]`.
    pub fn from_gray(gray: &::image::GrayImage) -> Result<Self> {
        let (w, h) = gray.dimensions();
        let data = gray.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Self::new(w as usize, h as usize, 1, data)
    }

    /// Decoded image of any pixel format, converted to grayscale.
    pub fn from_dynamic(img: &::image::DynamicImage) -> Result<Self> {
        Self::from_gray(&img.to_luma8())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Copy of this image with a different pixel buffer and channel count.
    /// Landmarks are kept.
    pub fn with_pixels(&self, n_channels: usize, pixels: Vec<f32>) -> Result<Self> {
        let mut out = Self::new(self.width, self.height, n_channels, pixels)?;
        out.landmarks = self.landmarks.clone();
        Ok(out)
    }

    /// Sample at integer coordinates. Returns 0 for out-of-bounds pixels.
    pub fn get(&self, x: i64, y: i64, channel: usize) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.pixels[(y as usize * self.width + x as usize) * self.n_channels + channel]
    }

    /// Bilinear sample with coordinates clamped to the image border.
    pub fn sample_bilinear(&self, x: f64, y: f64, channel: usize) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f64);
        let y = y.clamp(0.0, (self.height - 1) as f64);

        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let x1 = (x0 + 1).min(self.width as i64 - 1);
        let y1 = (y0 + 1).min(self.height as i64 - 1);

        let fx = (x - x0 as f64) as f32;
        let fy = (y - y0 as f64) as f32;

        let p00 = self.get(x0, y0, channel);
        let p10 = self.get(x1, y0, channel);
        let p01 = self.get(x0, y1, channel);
        let p11 = self.get(x1, y1, channel);

        let top = p00 * (1.0 - fx) + p10 * fx;
        let bottom = p01 * (1.0 - fx) + p11 * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Crop to the half-open pixel window `[x0, x1) × [y0, y1)`.
    pub fn crop(
        &self,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
    ) -> Result<(Image, AffineTransform)> {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return Err(Error::EmptyImage {
                width: x1.saturating_sub(x0),
                height: y1.saturating_sub(y0),
            });
        }
        let (w, h) = (x1 - x0, y1 - y0);
        let mut data = Vec::with_capacity(w * h * self.n_channels);
        for y in y0..y1 {
            let start = (y * self.width + x0) * self.n_channels;
            data.extend_from_slice(&self.pixels[start..start + w * self.n_channels]);
        }

        let transform = AffineTransform::translation(Point::new(-(x0 as f64), -(y0 as f64)));
        let mut out = Self::new(w, h, self.n_channels, data)?;
        out.landmarks = self.migrated_landmarks(&transform);
        Ok((out, transform))
    }

    /// Crop around `shape` with a border of `proportion · min(shape.range())`
    /// pixels on every side, clipped to the image.
    ///
    /// A proportion of 0 still crops, tightly to the shape's extent.
    pub fn crop_to_shape_proportion(
        &self,
        shape: &Shape,
        proportion: f64,
    ) -> Result<(Image, AffineTransform)> {
        if !proportion.is_finite() || proportion < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "crop proportion must be a non-negative number, got {}",
                proportion
            )));
        }
        if shape.is_empty() {
            return Err(Error::InvalidArgument("cannot crop to an empty shape".into()));
        }
        let range = shape.range();
        let boundary = proportion * range.x.min(range.y);
        let (min, max) = shape.bounds();

        let x0 = (min.x - boundary).floor().max(0.0) as usize;
        let y0 = (min.y - boundary).floor().max(0.0) as usize;
        let x1 = ((max.x + boundary).ceil() + 1.0).max(0.0) as usize;
        let y1 = ((max.y + boundary).ceil() + 1.0).max(0.0) as usize;
        self.crop(x0, y0, x1, y1)
    }

    pub fn crop_to_landmarks_proportion(
        &self,
        proportion: f64,
        group: &str,
    ) -> Result<(Image, AffineTransform)> {
        let shape = self
            .landmarks
            .get(group)
            .ok_or_else(|| Error::MissingLandmarkGroup(group.to_string()))?;
        self.crop_to_shape_proportion(shape, proportion)
    }

    /// Resample by a uniform `factor` with bilinear interpolation.
    pub fn rescale(&self, factor: f64) -> Result<(Image, AffineTransform)> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "rescale factor must be positive, got {}",
                factor
            )));
        }
        let w = (self.width as f64 * factor).round();
        let h = (self.height as f64 * factor).round();
        if w * h * self.n_channels as f64 > MAX_SAMPLES as f64 {
            return Err(Error::InvalidArgument(format!(
                "rescaling {}x{} by {} exceeds {} samples",
                self.width, self.height, factor, MAX_SAMPLES
            )));
        }
        let (w, h) = (w as usize, h as usize);
        if w == 0 || h == 0 {
            return Err(Error::EmptyImage { width: w, height: h });
        }

        let mut data = Vec::with_capacity(w * h * self.n_channels);
        for y in 0..h {
            let sy = y as f64 / factor;
            for x in 0..w {
                let sx = x as f64 / factor;
                for c in 0..self.n_channels {
                    data.push(self.sample_bilinear(sx, sy, c));
                }
            }
        }

        let transform = AffineTransform::scale(factor);
        let mut out = Self::new(w, h, self.n_channels, data)?;
        out.landmarks = self.migrated_landmarks(&transform);
        Ok((out, transform))
    }

    /// Rescale so that `shape` (given in this image's coordinates) ends up
    /// with the same spread as `reference`.
    pub fn rescale_to_shape(
        &self,
        reference: &Shape,
        shape: &Shape,
    ) -> Result<(Image, AffineTransform)> {
        let factor = align_uniform_scale(shape, reference)?;
        self.rescale(factor)
    }

    pub fn rescale_to_pointcloud(
        &self,
        reference: &Shape,
        group: &str,
    ) -> Result<(Image, AffineTransform)> {
        let shape = self
            .landmarks
            .get(group)
            .ok_or_else(|| Error::MissingLandmarkGroup(group.to_string()))?;
        self.rescale_to_shape(reference, shape)
    }

    fn migrated_landmarks(&self, transform: &AffineTransform) -> LandmarkGroups {
        let mut groups = self.landmarks.clone();
        groups.map_points(|p| *p = transform.apply_point(*p));
        groups
    }

    fn in_bounds(&self, p: &Point) -> bool {
        p.x >= 0.0
            && p.y >= 0.0
            && p.x <= (self.width - 1) as f64
            && p.y <= (self.height - 1) as f64
    }

    pub fn has_landmarks_outside_bounds(&self) -> bool {
        self.landmarks
            .iter()
            .any(|(_, shape)| shape.points.iter().any(|p| !self.in_bounds(p)))
    }

    /// Clamp every landmark point into `[0, width-1] × [0, height-1]`.
    pub fn constrain_landmarks_to_bounds(&mut self) {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        self.landmarks.map_points(|p| {
            p.x = p.x.clamp(0.0, max_x);
            p.y = p.y.clamp(0.0, max_y);
        });
    }
}
