//! Exact Euclidean distance transform
//!
//! Separable lower-envelope algorithm of Felzenszwalb & Huttenlocher (2012):
//! a 1-D squared-distance pass down every column, then along every row.
//! Linear in the number of cells and exact on the integer grid.
//!
//! Reference:
//! Felzenszwalb, P.F. & Huttenlocher, D.P. (2012). Distance Transforms of
//! Sampled Functions. *Theory of Computing*, 8, 415–428.

use ndarray::Array2;

use crate::maybe_rayon::*;

/// 1-D squared distance transform of `f` into `out`.
///
/// `f[q]` is 0 at feature cells and `+inf` elsewhere (or any finite partial
/// result from a previous pass). Cells with infinite `f` contribute no
/// parabola; if none is finite the output stays infinite.
fn lower_envelope(f: &[f64], out: &mut [f64]) {
    let n = f.len();
    // parabola vertices and the left boundary of each one's region
    let mut v: Vec<usize> = Vec::with_capacity(n);
    let mut z: Vec<f64> = Vec::with_capacity(n);

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        let fq = f[q] + (q * q) as f64;
        loop {
            let Some(&p) = v.last() else {
                v.push(q);
                z.push(f64::NEG_INFINITY);
                break;
            };
            let s = (fq - (f[p] + (p * p) as f64)) / (2.0 * (q - p) as f64);
            let left = z.last().copied().unwrap_or(f64::NEG_INFINITY);
            if s <= left {
                v.pop();
                z.pop();
            } else {
                v.push(q);
                z.push(s);
                break;
            }
        }
    }

    if v.is_empty() {
        out.iter_mut().for_each(|o| *o = f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, o) in out.iter_mut().enumerate() {
        while k + 1 < v.len() && z[k + 1] < q as f64 {
            k += 1;
        }
        let d = q as f64 - v[k] as f64;
        *o = d * d + f[v[k]];
    }
}

/// Squared Euclidean distance (in cells) from every cell to the nearest
/// `true` cell of `features`. Infinite everywhere when there is no feature.
pub(crate) fn squared_distance(features: &Array2<bool>) -> Array2<f64> {
    let (rows, cols) = features.dim();

    // column pass
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..rows)
                .map(|row| if features[[row, col]] { 0.0 } else { f64::INFINITY })
                .collect();
            let mut out = vec![0.0; rows];
            lower_envelope(&f, &mut out);
            out
        })
        .collect();

    // row pass
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let f: Vec<f64> = columns.iter().map(|column| column[row]).collect();
            let mut out = vec![0.0; cols];
            lower_envelope(&f, &mut out);
            out
        })
        .collect();

    // rows * cols elements by construction
    Array2::from_shape_vec((rows, cols), data)
        .unwrap_or_else(|_| Array2::from_elem((rows, cols), f64::INFINITY))
}

/// Euclidean distance (in cells) to the nearest `true` cell
pub(crate) fn euclidean_distance(features: &Array2<bool>) -> Array2<f64> {
    squared_distance(features).mapv_into(f64::sqrt)
}
