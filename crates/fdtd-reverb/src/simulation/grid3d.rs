//! 3D pressure grid for the FDTD scheme.
//!
//! Three same-sized buffers hold the pressure at t−1, t and t+1. Their roles
//! rotate every step by advancing a phase counter; the buffers themselves are
//! never copied or reallocated.
//!
//! Memory layout is x-fastest:
//! `index = (k * ny + j) * nx + i`

use crate::error::ConfigurationError;

/// Classification of a grid node by how many walls it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// No coordinate on a boundary
    Interior,
    /// One coordinate on a boundary
    Face,
    /// Two coordinates on a boundary
    Edge,
    /// All three coordinates on a boundary
    Corner,
}

impl NodeClass {
    /// All classes, ordered by boundary count.
    pub const ALL: [NodeClass; 4] = [
        NodeClass::Interior,
        NodeClass::Face,
        NodeClass::Edge,
        NodeClass::Corner,
    ];

    /// Class of a node touching `count` walls.
    #[inline]
    pub fn from_boundary_count(count: usize) -> NodeClass {
        match count {
            0 => NodeClass::Interior,
            1 => NodeClass::Face,
            2 => NodeClass::Edge,
            _ => NodeClass::Corner,
        }
    }

    /// Number of coordinates lying on a boundary.
    #[inline]
    pub fn boundary_count(self) -> usize {
        match self {
            NodeClass::Interior => 0,
            NodeClass::Face => 1,
            NodeClass::Edge => 2,
            NodeClass::Corner => 3,
        }
    }

    /// Weight of this class in the scheme's discrete inner product.
    ///
    /// A node on a wall only owns half of its cell along that axis.
    #[inline]
    pub fn quadrature_weight(self) -> f64 {
        match self {
            NodeClass::Interior => 1.0,
            NodeClass::Face => 0.5,
            NodeClass::Edge => 0.25,
            NodeClass::Corner => 0.125,
        }
    }
}

/// Largest node count whose three `f64` buffers fit in one address space.
pub const MAX_NODES: usize = isize::MAX as usize / (3 * std::mem::size_of::<f64>());

/// Validated grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    nx: usize,
    ny: usize,
    nz: usize,
}

impl GridDims {
    /// Create grid dimensions. Every axis needs at least 3 nodes so that
    /// interior, face, edge and corner nodes all exist and are disjoint.
    ///
    /// The node count must be addressable: the three pressure buffers
    /// together may not exceed `isize::MAX` bytes.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Result<Self, ConfigurationError> {
        if nx < 3 || ny < 3 || nz < 3 {
            return Err(ConfigurationError::InvalidDimensions { nx, ny, nz });
        }
        let nodes = nx.checked_mul(ny).and_then(|n| n.checked_mul(nz));
        match nodes {
            Some(n) if n <= MAX_NODES => Ok(Self { nx, ny, nz }),
            _ => Err(ConfigurationError::InvalidDimensions { nx, ny, nz }),
        }
    }

    /// Nodes along x.
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Nodes along y.
    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Nodes along z.
    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    /// `(nx, ny, nz)`
    #[inline]
    pub fn as_tuple(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// Total number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Always false; a valid grid has at least 27 nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Distance in the buffer between y-neighbours.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.nx
    }

    /// Distance in the buffer between z-neighbours.
    #[inline]
    pub fn slice_stride(&self) -> usize {
        self.nx * self.ny
    }

    /// Convert (i, j, k) coordinates to a linear index.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.ny + j) * self.nx + i
    }

    /// Convert a linear index to (i, j, k) coordinates.
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let k = idx / self.slice_stride();
        let remainder = idx % self.slice_stride();
        (remainder % self.nx, remainder / self.nx, k)
    }

    /// Check if coordinates are within bounds.
    #[inline]
    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        i < self.nx && j < self.ny && k < self.nz
    }

    /// Classify a node. Coordinates must be in bounds.
    #[inline]
    pub fn classify(&self, i: usize, j: usize, k: usize) -> NodeClass {
        let on_wall = |v: usize, n: usize| usize::from(v == 0 || v == n - 1);
        NodeClass::from_boundary_count(
            on_wall(i, self.nx) + on_wall(j, self.ny) + on_wall(k, self.nz),
        )
    }

    /// Closed-form node count of a class.
    pub fn class_count(&self, class: NodeClass) -> usize {
        let (a, b, c) = (self.nx - 2, self.ny - 2, self.nz - 2);
        match class {
            NodeClass::Interior => a * b * c,
            NodeClass::Face => 2 * (a * b + b * c + a * c),
            NodeClass::Edge => 4 * (a + b + c),
            NodeClass::Corner => 8,
        }
    }

    /// Visit every node of one class exactly once.
    ///
    /// Boundary nodes are enumerated by choosing which axes sit on a wall
    /// (a bit mask) and which wall of each such axis (a side mask); the
    /// remaining axes sweep their interior range. Iteration order within a
    /// region is x-fastest.
    pub fn for_each_node<F>(&self, class: NodeClass, mut f: F)
    where
        F: FnMut(usize, usize, usize),
    {
        let dims = [self.nx, self.ny, self.nz];
        let walls = class.boundary_count();

        for axes in 0u8..8 {
            if axes.count_ones() as usize != walls {
                continue;
            }
            for sides in 0u8..(1 << walls) {
                let mut ranges = [(0usize, 0usize); 3];
                let mut side_bit = 0;
                for (axis, range) in ranges.iter_mut().enumerate() {
                    let n = dims[axis];
                    *range = if axes & (1 << axis) != 0 {
                        let wall = if sides & (1 << side_bit) != 0 { n - 1 } else { 0 };
                        side_bit += 1;
                        (wall, wall + 1)
                    } else {
                        (1, n - 1)
                    };
                }

                for k in ranges[2].0..ranges[2].1 {
                    for j in ranges[1].0..ranges[1].1 {
                        for i in ranges[0].0..ranges[0].1 {
                            f(i, j, k);
                        }
                    }
                }
            }
        }
    }
}

/// Owner of the three pressure buffers.
pub struct PressureGrid {
    dims: GridDims,
    buffers: [Vec<f64>; 3],
    /// Buffer index currently holding t−1; t and t+1 follow cyclically.
    phase: usize,
}

impl PressureGrid {
    /// Allocate three zeroed buffers.
    pub fn new(dims: GridDims) -> Self {
        let len = dims.len();
        Self {
            dims,
            buffers: [vec![0.0; len], vec![0.0; len], vec![0.0; len]],
            phase: 0,
        }
    }

    /// Grid dimensions.
    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Buffer index of the t−1 field. Exposed for diagnostics.
    #[inline]
    pub fn phase(&self) -> usize {
        self.phase
    }

    #[inline]
    fn slot(&self, offset: usize) -> usize {
        (self.phase + offset) % 3
    }

    /// Pressure at t−1.
    #[inline]
    pub fn previous(&self) -> &[f64] {
        &self.buffers[self.slot(0)]
    }

    /// Pressure at t.
    #[inline]
    pub fn current(&self) -> &[f64] {
        &self.buffers[self.slot(1)]
    }

    /// Write target for t+1. Holds stale data between steps.
    #[inline]
    pub fn next(&self) -> &[f64] {
        &self.buffers[self.slot(2)]
    }

    /// Mutable pressure at t, for source injection.
    #[inline]
    pub fn current_mut(&mut self) -> &mut [f64] {
        let slot = self.slot(1);
        &mut self.buffers[slot]
    }

    /// Mutable pressure at t−1, for source injection.
    #[inline]
    pub fn previous_mut(&mut self) -> &mut [f64] {
        let slot = self.slot(0);
        &mut self.buffers[slot]
    }

    /// Borrow `(previous, current, next)` at once for the stencil update.
    #[inline]
    pub fn split_roles(&mut self) -> (&[f64], &[f64], &mut [f64]) {
        let [b0, b1, b2] = &mut self.buffers;
        match self.phase {
            0 => (b0.as_slice(), b1.as_slice(), b2.as_mut_slice()),
            1 => (b1.as_slice(), b2.as_slice(), b0.as_mut_slice()),
            _ => (b2.as_slice(), b0.as_slice(), b1.as_mut_slice()),
        }
    }

    /// Promote next → current → previous; the old previous becomes the
    /// next write target. Only the phase changes.
    #[inline]
    pub fn rotate(&mut self) {
        self.phase = (self.phase + 1) % 3;
    }

    /// Zero all three buffers without reallocating.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
    }

    /// Pressure at t for a node.
    #[inline]
    pub fn pressure(&self, i: usize, j: usize, k: usize) -> f64 {
        self.current()[self.dims.index(i, j, k)]
    }

    /// Maximum absolute pressure at t.
    pub fn max_pressure(&self) -> f64 {
        self.current()
            .iter()
            .map(|p| p.abs())
            .fold(0.0_f64, f64::max)
    }
}
