//! Scheme coefficients for the four node classes.
//!
//! Every node update has the form
//!
//! ```text
//! next = D1 · (Σ neighbours + 2·current) − D2 · previous
//! ```
//!
//! where the neighbour sum already contains the mirrored terms at the walls.
//! Interior nodes use the lossless pair (1/4, 1). Boundary nodes fold the wall
//! loss into their pair; the loss grows with the number of walls the node
//! touches. At `R = 1` all four pairs coincide.

use super::grid3d::NodeClass;
use crate::error::ConfigurationError;

/// The (D1, D2) pair of one node class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilWeights {
    /// Weight of the neighbour sum plus twice the centre value.
    pub d1: f64,
    /// Weight of the previous value.
    pub d2: f64,
}

/// All eight coefficients of the scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemeCoefficients {
    /// Reflection coefficient the set was derived from.
    pub reflection: f64,
    /// Interior (Dg1, Dg2)
    pub interior: StencilWeights,
    /// Face (Di1, Di2)
    pub face: StencilWeights,
    /// Edge (De1, De2)
    pub edge: StencilWeights,
    /// Corner (Dc1, Dc2)
    pub corner: StencilWeights,
}

impl SchemeCoefficients {
    /// Derive the coefficients for a reflection coefficient `r`.
    ///
    /// `r` must be finite and lie in `[0, 1]`; the two zero denominators at
    /// `R = −3` and `R = 5` are reported separately.
    pub fn derive(r: f64) -> Result<Self, ConfigurationError> {
        if !r.is_finite() {
            return Err(ConfigurationError::degenerate(r, "reflection is not finite"));
        }
        if r + 3.0 == 0.0 {
            return Err(ConfigurationError::degenerate(
                r,
                "face coefficients divide by R + 3",
            ));
        }
        if 5.0 - r == 0.0 {
            return Err(ConfigurationError::degenerate(
                r,
                "corner coefficients divide by 5 - R",
            ));
        }
        if !(0.0..=1.0).contains(&r) {
            return Err(ConfigurationError::degenerate(
                r,
                "reflection must lie in [0, 1]",
            ));
        }

        let coefficients = Self {
            reflection: r,
            interior: StencilWeights { d1: 0.25, d2: 1.0 },
            face: StencilWeights {
                d1: (r + 1.0) / (2.0 * (r + 3.0)),
                d2: (3.0 * r + 1.0) / (r + 3.0),
            },
            edge: StencilWeights {
                d1: (r + 1.0) / 8.0,
                d2: r,
            },
            corner: StencilWeights {
                d1: (r + 1.0) / (2.0 * (5.0 - r)),
                d2: (5.0 * r - 1.0) / (5.0 - r),
            },
        };

        if coefficients.as_array().iter().any(|c| !c.is_finite()) {
            return Err(ConfigurationError::degenerate(r, "coefficient overflow"));
        }
        Ok(coefficients)
    }

    /// Weights for a node class.
    #[inline]
    pub fn weights(&self, class: NodeClass) -> StencilWeights {
        match class {
            NodeClass::Interior => self.interior,
            NodeClass::Face => self.face,
            NodeClass::Edge => self.edge,
            NodeClass::Corner => self.corner,
        }
    }

    /// `[Dg1, Dg2, Di1, Di2, De1, De2, Dc1, Dc2]`
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.interior.d1,
            self.interior.d2,
            self.face.d1,
            self.face.d2,
            self.edge.d1,
            self.edge.d2,
            self.corner.d1,
            self.corner.d2,
        ]
    }
}
