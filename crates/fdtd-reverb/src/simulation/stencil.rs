//! 7-point leapfrog update, one pass per node class.
//!
//! At a wall the missing outward neighbour is replaced by its mirror image,
//! the inward neighbour, so a face node sees its inward neighbour twice.
//! The interior pass is a tight strided loop; the three boundary passes share
//! one routine that walks the class's nodes and mirrors as needed.

use super::coefficients::{SchemeCoefficients, StencilWeights};
use super::grid3d::{GridDims, NodeClass, PressureGrid};

/// Magnitudes below this are written as exact zero.
pub const DENORMAL_FLOOR: f64 = 1e-30;

/// Flush values too small to matter to zero, keeping long tails out of the
/// subnormal range.
#[inline(always)]
pub fn flush_denormal(x: f64) -> f64 {
    if x.abs() < DENORMAL_FLOOR {
        0.0
    } else {
        x
    }
}

/// Lower and upper neighbour along one axis, mirrored at the walls.
#[inline(always)]
fn mirrored(v: usize, n: usize) -> (usize, usize) {
    let lo = if v == 0 { 1 } else { v - 1 };
    let hi = if v == n - 1 { n - 2 } else { v + 1 };
    (lo, hi)
}

/// Sum of the six neighbours of `(i, j, k)` with walls mirrored.
#[inline]
pub fn neighbour_sum(dims: &GridDims, field: &[f64], i: usize, j: usize, k: usize) -> f64 {
    let (il, ih) = mirrored(i, dims.nx());
    let (jl, jh) = mirrored(j, dims.ny());
    let (kl, kh) = mirrored(k, dims.nz());

    field[dims.index(il, j, k)]
        + field[dims.index(ih, j, k)]
        + field[dims.index(i, jl, k)]
        + field[dims.index(i, jh, k)]
        + field[dims.index(i, j, kl)]
        + field[dims.index(i, j, kh)]
}

/// Fill `next` for every node of the grid.
///
/// Reads only `current` and `previous`. Does not rotate.
pub fn update(coefficients: &SchemeCoefficients, grid: &mut PressureGrid) {
    let dims = grid.dims();
    let (previous, current, next) = grid.split_roles();

    update_interior(&dims, coefficients.interior, previous, current, next);
    for class in [NodeClass::Face, NodeClass::Edge, NodeClass::Corner] {
        update_boundary(
            &dims,
            class,
            coefficients.weights(class),
            previous,
            current,
            next,
        );
    }
}

fn update_interior(
    dims: &GridDims,
    weights: StencilWeights,
    previous: &[f64],
    current: &[f64],
    next: &mut [f64],
) {
    let (nx, ny, nz) = dims.as_tuple();
    let row = dims.row_stride();
    let slice = dims.slice_stride();

    for k in 1..nz - 1 {
        for j in 1..ny - 1 {
            let base = dims.index(0, j, k);
            for idx in base + 1..base + nx - 1 {
                let sum = current[idx - 1]
                    + current[idx + 1]
                    + current[idx - row]
                    + current[idx + row]
                    + current[idx - slice]
                    + current[idx + slice];

                next[idx] = flush_denormal(
                    weights.d1 * (sum + 2.0 * current[idx]) - weights.d2 * previous[idx],
                );
            }
        }
    }
}

fn update_boundary(
    dims: &GridDims,
    class: NodeClass,
    weights: StencilWeights,
    previous: &[f64],
    current: &[f64],
    next: &mut [f64],
) {
    dims.for_each_node(class, |i, j, k| {
        let idx = dims.index(i, j, k);
        let sum = neighbour_sum(dims, current, i, j, k);
        next[idx] =
            flush_denormal(weights.d1 * (sum + 2.0 * current[idx]) - weights.d2 * previous[idx]);
    });
}

/// Apply the scheme's spatial operator `(6u − Σ mirrored neighbours) / 4`
/// at one node.
#[inline]
pub fn operator_at(dims: &GridDims, field: &[f64], i: usize, j: usize, k: usize) -> f64 {
    let idx = dims.index(i, j, k);
    (6.0 * field[idx] - neighbour_sum(dims, field, i, j, k)) * 0.25
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centred_pulse(r: f64) -> (SchemeCoefficients, PressureGrid) {
        let dims = GridDims::new(3, 3, 3).unwrap();
        let mut grid = PressureGrid::new(dims);
        let centre = dims.index(1, 1, 1);
        grid.current_mut()[centre] = 1.0;
        (SchemeCoefficients::derive(r).unwrap(), grid)
    }

    #[test]
    fn test_mirrored_neighbours() {
        assert_eq!(mirrored(0, 5), (1, 1));
        assert_eq!(mirrored(4, 5), (3, 3));
        assert_eq!(mirrored(2, 5), (1, 3));
    }

    #[test]
    fn test_interior_update() {
        let (c, mut grid) = centred_pulse(0.95);
        update(&c, &mut grid);

        let dims = grid.dims();
        assert!((grid.next()[dims.index(1, 1, 1)] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_face_sees_mirror_twice() {
        let (c, mut grid) = centred_pulse(0.95);
        update(&c, &mut grid);

        let dims = grid.dims();
        let expected = c.face.d1 * 2.0;
        for (i, j, k) in [(0, 1, 1), (2, 1, 1), (1, 0, 1), (1, 1, 2)] {
            let got = grid.next()[dims.index(i, j, k)];
            assert!((got - expected).abs() < 1e-15, "({}, {}, {}) = {}", i, j, k, got);
        }

        // Edges and corners are two hops away from the pulse
        assert_eq!(grid.next()[dims.index(0, 0, 1)], 0.0);
        assert_eq!(grid.next()[dims.index(2, 2, 2)], 0.0);
    }

    #[test]
    fn test_previous_term() {
        let dims = GridDims::new(4, 4, 4).unwrap();
        let mut grid = PressureGrid::new(dims);
        let c = SchemeCoefficients::derive(0.5).unwrap();
        grid.previous_mut().fill(1.0);

        update(&c, &mut grid);

        assert_eq!(grid.next()[dims.index(1, 2, 1)], -c.interior.d2);
        assert_eq!(grid.next()[dims.index(0, 2, 1)], -c.face.d2);
        assert_eq!(grid.next()[dims.index(0, 0, 1)], -c.edge.d2);
        assert_eq!(grid.next()[dims.index(3, 3, 3)], -c.corner.d2);
    }

    #[test]
    fn test_every_node_written() {
        let dims = GridDims::new(5, 3, 4).unwrap();
        let mut grid = PressureGrid::new(dims);
        grid.rotate();
        grid.rotate();
        // Stale garbage in the write target must be overwritten everywhere
        grid.previous_mut().fill(0.0);
        {
            let (_, _, next) = grid.split_roles();
            next.fill(f64::NAN);
        }

        update(&SchemeCoefficients::derive(0.9).unwrap(), &mut grid);
        assert!(grid.next().iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_denormals_flushed() {
        assert_eq!(flush_denormal(1e-31), 0.0);
        assert_eq!(flush_denormal(-1e-31), 0.0);
        assert_eq!(flush_denormal(1e-29), 1e-29);

        let dims = GridDims::new(3, 3, 3).unwrap();
        let mut grid = PressureGrid::new(dims);
        grid.current_mut()[dims.index(1, 1, 1)] = 1e-31;
        update(&SchemeCoefficients::derive(1.0).unwrap(), &mut grid);
        assert!(grid.next().iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_operator_of_constant_field() {
        // Mirroring keeps a constant field in the operator's null space
        let dims = GridDims::new(4, 3, 5).unwrap();
        let field = vec![2.5; dims.len()];
        for (i, j, k) in [(0, 0, 0), (1, 1, 1), (3, 2, 4), (0, 1, 2)] {
            assert_eq!(operator_at(&dims, &field, i, j, k), 0.0);
        }
    }
}
