//! Euclidean distance matrix (EDM) feature construction.
//!
//! The action classifier does not consume raw coordinates; it consumes the
//! frame-wise matrix of pairwise inter-joint distances, which is invariant to
//! rigid translation of the whole body.

use ndarray::Array4;

use motiongan_core::{Error, Result};

const EDM_EPS: f32 = 1e-8;

/// Map coordinates `(batch, joints, time, 3)` to pairwise distances
/// `(batch, joints * joints, time, 1)`, row-major over `(j1, j2)`.
pub fn edm(coords: &Array4<f32>) -> Result<Array4<f32>> {
    let (batch, joints, time, channels) = coords.dim();
    if channels != 3 {
        return Err(Error::shape_mismatch(
            &[batch, joints, time, 3],
            coords.shape(),
        ));
    }

    let mut out = Array4::<f32>::zeros((batch, joints * joints, time, 1));
    for b in 0..batch {
        for t in 0..time {
            for j1 in 0..joints {
                // The matrix is symmetric with a zero diagonal; filling both
                // triangles keeps the row-major layout the conv stack expects.
                for j2 in (j1 + 1)..joints {
                    let mut sq = 0.0f32;
                    for c in 0..3 {
                        let d = coords[[b, j1, t, c]] - coords[[b, j2, t, c]];
                        sq += d * d;
                    }
                    let dist = (sq + EDM_EPS).sqrt();
                    out[[b, j1 * joints + j2, t, 0]] = dist;
                    out[[b, j2 * joints + j1, t, 0]] = dist;
                }
            }
        }
    }
    Ok(out)
}
