//! Optimal alignment transforms between corresponding point clouds.
//!
//! Any function with the signature `Fn(&Shape, &Shape) -> Result<AffineTransform>`
//! can serve as an "alignment class" for the utilities in this crate;
//! [`similarity_alignment`] and [`affine_alignment`] are the two stock ones.

use nalgebra::{Matrix3, Vector3};

use crate::error::{Error, Result};
use crate::transform::AffineTransform;
use crate::types::Shape;

fn check_correspondence(source: &Shape, target: &Shape, min_points: usize) -> Result<()> {
    if source.n_points() != target.n_points() {
        return Err(Error::DegenerateAlignment(format!(
            "source has {} points but target has {}",
            source.n_points(),
            target.n_points()
        )));
    }
    if source.n_points() < min_points {
        return Err(Error::DegenerateAlignment(format!(
            "need at least {} points, got {}",
            min_points,
            source.n_points()
        )));
    }
    Ok(())
}

/// Uniform scale factor mapping the spread of `source` onto that of `target`
/// (ratio of centred Frobenius norms).
pub fn align_uniform_scale(source: &Shape, target: &Shape) -> Result<f64> {
    check_correspondence(source, target, 1)?;
    let source_norm = source.norm();
    if source_norm <= f64::EPSILON {
        return Err(Error::DegenerateAlignment(
            "source shape has zero spread".into(),
        ));
    }
    Ok(target.norm() / source_norm)
}

/// Procrustes similarity alignment of `source` onto `target`.
///
/// Both shapes are centred, the scale is the ratio of their norms and, when
/// `rotation` is set, the optimal 2D rotation is solved in closed form.
/// Without rotation the result is a uniform scale plus translation.
pub fn align_similarity(source: &Shape, target: &Shape, rotation: bool) -> Result<AffineTransform> {
    let scale = align_uniform_scale(source, target)?;
    let cs = source.centroid();
    let ct = target.centroid();

    let angle = if rotation {
        let mut dot = 0.0;
        let mut cross = 0.0;
        for (s, t) in source.points.iter().zip(target.points.iter()) {
            let s = *s - cs;
            let t = *t - ct;
            dot += s.x * t.x + s.y * t.y;
            cross += s.x * t.y - s.y * t.x;
        }
        cross.atan2(dot)
    } else {
        0.0
    };

    let (sin, cos) = angle.sin_cos();
    let linear = AffineTransform::from_parts(
        scale * cos,
        -scale * sin,
        scale * sin,
        scale * cos,
        0.0,
        0.0,
    );
    Ok(AffineTransform::translation(ct)
        .compose_after(&linear)
        .compose_after(&AffineTransform::translation(cs * -1.0)))
}

/// Least-squares affine alignment of `source` onto `target`.
pub fn align_affine(source: &Shape, target: &Shape) -> Result<AffineTransform> {
    check_correspondence(source, target, 3)?;

    let mut ata = Matrix3::<f64>::zeros();
    let mut atx = Vector3::<f64>::zeros();
    let mut aty = Vector3::<f64>::zeros();
    for (s, t) in source.points.iter().zip(target.points.iter()) {
        let row = Vector3::new(s.x, s.y, 1.0);
        ata += row * row.transpose();
        atx += row * t.x;
        aty += row * t.y;
    }

    let lu = ata.lu();
    let (px, py) = match (lu.solve(&atx), lu.solve(&aty)) {
        (Some(px), Some(py)) => (px, py),
        _ => {
            return Err(Error::DegenerateAlignment(
                "source points are collinear".into(),
            ))
        }
    };
    if !px.iter().chain(py.iter()).all(|v| v.is_finite()) {
        return Err(Error::DegenerateAlignment(
            "source points are collinear".into(),
        ));
    }

    Ok(AffineTransform::from_parts(
        px[0], px[1], py[0], py[1], px[2], py[2],
    ))
}

/// Similarity alignment with rotation; the default alignment class.
pub fn similarity_alignment(source: &Shape, target: &Shape) -> Result<AffineTransform> {
    align_similarity(source, target, true)
}

pub fn affine_alignment(source: &Shape, target: &Shape) -> Result<AffineTransform> {
    align_affine(source, target)
}

/// Aligns `shape` to `bounding_box`: the alignment is estimated between the
/// shape's own bounding box and the target box, then applied to every point
/// of the shape.
pub fn align_shape_with_bounding_box<F>(
    shape: &Shape,
    bounding_box: &Shape,
    alignment: F,
) -> Result<Shape>
where
    F: Fn(&Shape, &Shape) -> Result<AffineTransform>,
{
    let shape_bb = shape.bounding_box();
    let transform = alignment(&shape_bb, bounding_box)?;
    Ok(transform.apply(shape))
}
