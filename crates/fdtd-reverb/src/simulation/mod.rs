//! FDTD room simulation.
//!
//! Provides:
//! - Medium and wall physics, reflection coefficient
//! - Scheme coefficients for interior, face, edge and corner nodes
//! - The pressure grid with rotating buffers and node classification
//! - The stencil engine and the per-sample time-stepper
//!
//! ```
//! use fdtd_reverb::simulation::{Solver, SolverConfig};
//!
//! let mut solver = Solver::configure(SolverConfig::small_box()).unwrap();
//! let first = solver.step(1.0);
//! assert_eq!(first, 0.0);
//! ```

pub mod coefficients;
pub mod grid3d;
pub mod physics;
pub mod stencil;

pub use coefficients::{SchemeCoefficients, StencilWeights};
pub use grid3d::{GridDims, NodeClass, PressureGrid};
pub use physics::{MediumProperties, WallModel};

use crate::error::ConfigurationError;
use physics::constants::COURANT_NUMBER;
use tracing::{debug, info, warn};

/// Grids above this many nodes are unlikely to run one step per sample in
/// real time.
pub const LARGE_GRID_NODES: usize = 32 * 32 * 32;

/// How the input sample enters the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectionMode {
    /// Add the input to the current pressure at the injection node.
    #[default]
    Additive,

    /// Also add the previous input to the previous pressure at the
    /// injection node. The net source is a difference, so the field carries
    /// no DC offset once the input stops.
    Differential,
}

/// Configuration for creating a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Nodes along x
    pub nx: usize,
    /// Nodes along y
    pub ny: usize,
    /// Nodes along z
    pub nz: usize,
    /// Medium filling the room
    pub medium: MediumProperties,
    /// Wall model shared by all six walls
    pub wall: WallModel,
    /// Audio sample rate (Hz); one step per sample
    pub sample_rate: f64,
    /// Node receiving the input signal
    pub injection: (usize, usize, usize),
    /// Node the output is read from
    pub extraction: (usize, usize, usize),
    /// Source injection mode
    pub injection_mode: InjectionMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            nx: 10,
            ny: 10,
            nz: 10,
            medium: MediumProperties::room_air(),
            wall: WallModel::default(),
            sample_rate: 48_000.0,
            injection: (3, 3, 3),
            extraction: (5, 7, 7),
            injection_mode: InjectionMode::Additive,
        }
    }
}

/// Place a node at `tenths / 10` of an axis, kept off the walls.
fn scaled_node(n: usize, tenths: usize) -> usize {
    let scaled = n / 10 * tenths + n % 10 * tenths / 10;
    scaled.clamp(1, n.saturating_sub(2).max(1))
}

impl SolverConfig {
    /// Smallest useful room: 6×6×6 nodes.
    pub fn small_box() -> Self {
        Self {
            nx: 6,
            ny: 6,
            nz: 6,
            injection: (1, 2, 2),
            extraction: (4, 3, 3),
            ..Default::default()
        }
    }

    /// Larger, livelier chamber: 24×16×20 nodes, R = 0.98.
    pub fn chamber() -> Self {
        Self {
            wall: WallModel::Reflection(0.98),
            ..Default::default()
        }
        .with_dimensions(24, 16, 20)
        .with_scaled_nodes()
    }

    /// Default grid with poured concrete walls.
    pub fn concrete_box() -> Self {
        Self::default().with_wall(WallModel::Material(MediumProperties::concrete()))
    }

    /// Grid for a physical room of the given size (meters) at a sample rate.
    ///
    /// The cell size is fixed by the sample rate, so large rooms at high
    /// sample rates produce large grids. Rooms whose grid would not fit in
    /// memory are rejected with [`ConfigurationError::InvalidRoomSize`].
    pub fn for_room(
        width: f64,
        height: f64,
        depth: f64,
        sample_rate: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigurationError::InvalidSampleRate(sample_rate));
        }
        for length in [width, height, depth] {
            if !(length.is_finite() && length > 0.0) {
                return Err(ConfigurationError::InvalidRoomSize(length));
            }
        }

        let config = Self::default().with_sample_rate(sample_rate);
        let h = config.cell_size();
        let mut counts = [0usize; 3];
        for (count, length) in counts.iter_mut().zip([width, height, depth]) {
            let nodes = (length / h).round();
            if nodes > grid3d::MAX_NODES as f64 {
                return Err(ConfigurationError::InvalidRoomSize(length));
            }
            *count = (nodes as usize).max(3);
        }
        let [nx, ny, nz] = counts;
        GridDims::new(nx, ny, nz)
            .map_err(|_| ConfigurationError::InvalidRoomSize(width.max(height).max(depth)))?;

        Ok(config.with_dimensions(nx, ny, nz).with_scaled_nodes())
    }

    /// Set the grid dimensions. Injection and extraction nodes are kept.
    pub fn with_dimensions(mut self, nx: usize, ny: usize, nz: usize) -> Self {
        self.nx = nx;
        self.ny = ny;
        self.nz = nz;
        self
    }

    /// Move injection and extraction to the same relative positions as the
    /// default 10×10×10 layout.
    pub fn with_scaled_nodes(mut self) -> Self {
        self.injection = (
            scaled_node(self.nx, 3),
            scaled_node(self.ny, 3),
            scaled_node(self.nz, 3),
        );
        self.extraction = (
            scaled_node(self.nx, 5),
            scaled_node(self.ny, 7),
            scaled_node(self.nz, 7),
        );
        self
    }

    /// Set the medium.
    pub fn with_medium(mut self, medium: MediumProperties) -> Self {
        self.medium = medium;
        self
    }

    /// Set the wall model.
    pub fn with_wall(mut self, wall: WallModel) -> Self {
        self.wall = wall;
        self
    }

    /// Set the reflection coefficient directly.
    pub fn with_reflection(self, r: f64) -> Self {
        self.with_wall(WallModel::Reflection(r))
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the injection node.
    pub fn with_injection(mut self, i: usize, j: usize, k: usize) -> Self {
        self.injection = (i, j, k);
        self
    }

    /// Set the extraction node.
    pub fn with_extraction(mut self, i: usize, j: usize, k: usize) -> Self {
        self.extraction = (i, j, k);
        self
    }

    /// Set the injection mode.
    pub fn with_injection_mode(mut self, mode: InjectionMode) -> Self {
        self.injection_mode = mode;
        self
    }

    /// Validate the grid dimensions.
    pub fn dims(&self) -> Result<GridDims, ConfigurationError> {
        GridDims::new(self.nx, self.ny, self.nz)
    }

    /// Resolve the wall model and derive the scheme coefficients.
    pub fn scheme_coefficients(&self) -> Result<SchemeCoefficients, ConfigurationError> {
        let r = self.wall.reflection(&self.medium)?;
        SchemeCoefficients::derive(r)
    }

    /// Time step T = 1/fs (seconds).
    pub fn time_step(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Courant number c·T/h, fixed by the interior coefficient.
    pub fn courant_number(&self) -> f64 {
        COURANT_NUMBER
    }

    /// Grid spacing h = c·T/λ (meters).
    pub fn cell_size(&self) -> f64 {
        self.medium.speed_of_sound * self.time_step() / COURANT_NUMBER
    }

    /// Room size the grid represents (meters).
    pub fn physical_dimensions(&self) -> (f64, f64, f64) {
        let h = self.cell_size();
        (
            self.nx as f64 * h,
            self.ny as f64 * h,
            self.nz as f64 * h,
        )
    }

    /// Highest frequency resolved with ten cells per wavelength.
    pub fn max_frequency(&self) -> f64 {
        self.medium.speed_of_sound / (10.0 * self.cell_size())
    }
}

fn interior_node(
    dims: &GridDims,
    role: &'static str,
    (i, j, k): (usize, usize, usize),
) -> Result<usize, ConfigurationError> {
    if !dims.contains(i, j, k) || dims.classify(i, j, k) != NodeClass::Interior {
        return Err(ConfigurationError::NodeOutOfBounds { role, i, j, k });
    }
    Ok(dims.index(i, j, k))
}

fn touches_shell(dims: &GridDims, (i, j, k): (usize, usize, usize)) -> bool {
    i == 1 || j == 1 || k == 1 || i == dims.nx() - 2 || j == dims.ny() - 2 || k == dims.nz() - 2
}

/// Per-sample FDTD time-stepper.
///
/// A `Solver` only exists in the ready state: every check happens in
/// [`Solver::configure`] and [`Solver::step`] cannot fail.
pub struct Solver {
    config: SolverConfig,
    grid: PressureGrid,
    coefficients: SchemeCoefficients,
    injection: usize,
    extraction: usize,
    previous_input: f64,
    step: u64,
}

impl Solver {
    /// Validate a configuration, allocate zeroed fields and derive the
    /// coefficients.
    pub fn configure(config: SolverConfig) -> Result<Self, ConfigurationError> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(ConfigurationError::InvalidSampleRate(config.sample_rate));
        }
        let dims = config.dims()?;
        let injection = interior_node(&dims, "Injection", config.injection)?;
        let extraction = interior_node(&dims, "Extraction", config.extraction)?;
        let coefficients = config.scheme_coefficients()?;

        info!(
            "Configured {}x{}x{} FDTD grid ({} nodes, R = {:.4}, {} Hz)",
            dims.nx(),
            dims.ny(),
            dims.nz(),
            dims.len(),
            coefficients.reflection,
            config.sample_rate
        );
        debug!(
            "Node classes: {} interior, {} face, {} edge, {} corner; cell size {:.4} m",
            dims.class_count(NodeClass::Interior),
            dims.class_count(NodeClass::Face),
            dims.class_count(NodeClass::Edge),
            dims.class_count(NodeClass::Corner),
            config.cell_size()
        );
        if dims.len() > LARGE_GRID_NODES {
            warn!(
                "Grid has {} nodes; one step per sample may not keep up in real time",
                dims.len()
            );
        }
        for (role, node) in [("Injection", config.injection), ("Extraction", config.extraction)] {
            if touches_shell(&dims, node) {
                warn!("{} node {:?} is adjacent to a wall", role, node);
            }
        }

        Ok(Self {
            grid: PressureGrid::new(dims),
            coefficients,
            injection,
            extraction,
            previous_input: 0.0,
            step: 0,
            config,
        })
    }

    /// Advance one sample: inject, update, rotate, extract.
    #[inline]
    pub fn step(&mut self, input: f64) -> f64 {
        self.grid.current_mut()[self.injection] += input;
        if self.config.injection_mode == InjectionMode::Differential {
            self.grid.previous_mut()[self.injection] += self.previous_input;
            self.previous_input = input;
        }

        stencil::update(&self.coefficients, &mut self.grid);
        self.grid.rotate();
        self.step += 1;

        self.grid.current()[self.extraction]
    }

    /// Step once per input sample, writing the outputs.
    ///
    /// Stops at the shorter of the two slices.
    pub fn process(&mut self, input: &[f64], output: &mut [f64]) {
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.step(*x);
        }
    }

    /// Step once per sample of an audio buffer, replacing it with the output.
    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.step(f64::from(*sample)) as f32;
        }
    }

    /// Step `n` times with silent input.
    pub fn step_n(&mut self, n: usize) {
        for _ in 0..n {
            self.step(0.0);
        }
    }

    /// Zero all fields and the step counter. Coefficients are kept.
    pub fn reset(&mut self) {
        self.grid.clear();
        self.previous_input = 0.0;
        self.step = 0;
    }

    /// Change the wall model, re-deriving the coefficients.
    ///
    /// On error the solver keeps its previous coefficients.
    pub fn set_wall(&mut self, wall: WallModel) -> Result<(), ConfigurationError> {
        let r = wall.reflection(&self.config.medium)?;
        let coefficients = SchemeCoefficients::derive(r)?;
        self.install_wall(wall, coefficients);
        Ok(())
    }

    pub(crate) fn install_wall(&mut self, wall: WallModel, coefficients: SchemeCoefficients) {
        debug!("Wall reflection set to {:.4}", coefficients.reflection);
        self.config.wall = wall;
        self.coefficients = coefficients;
    }

    /// Discrete energy of the field.
    ///
    /// The quantity conserved by the scheme at R = 1 and non-increasing for
    /// R < 1 once the input is silent:
    ///
    /// ```text
    /// E = Σ w · ((cur − prev)² + cur · A·prev)
    /// ```
    ///
    /// with `w` the node's [quadrature weight](NodeClass::quadrature_weight)
    /// and `A` the mirrored Laplacian operator.
    pub fn energy(&self) -> f64 {
        let dims = self.grid.dims();
        let current = self.grid.current();
        let previous = self.grid.previous();

        let mut energy = 0.0;
        for class in NodeClass::ALL {
            let w = class.quadrature_weight();
            dims.for_each_node(class, |i, j, k| {
                let idx = dims.index(i, j, k);
                let d = current[idx] - previous[idx];
                let coupling = current[idx] * stencil::operator_at(&dims, previous, i, j, k);
                energy += w * (d * d + coupling);
            });
        }
        energy
    }

    /// Maximum absolute pressure at the current time.
    pub fn max_pressure(&self) -> f64 {
        self.grid.max_pressure()
    }

    /// Pressure at a node, or `None` when out of bounds.
    pub fn pressure_at(&self, i: usize, j: usize, k: usize) -> Option<f64> {
        let dims = self.grid.dims();
        dims.contains(i, j, k).then(|| self.grid.pressure(i, j, k))
    }

    /// Node count per class.
    pub fn class_counts(&self) -> [(NodeClass, usize); 4] {
        let dims = self.grid.dims();
        NodeClass::ALL.map(|class| (class, dims.class_count(class)))
    }

    /// Steps taken since configuration or the last reset.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Simulated time (seconds).
    pub fn elapsed(&self) -> f64 {
        self.step as f64 * self.config.time_step()
    }

    /// Grid dimensions.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        self.grid.dims().as_tuple()
    }

    /// Active scheme coefficients.
    pub fn coefficients(&self) -> &SchemeCoefficients {
        &self.coefficients
    }

    /// Configuration the solver was built from, with the current wall.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Read access to the pressure buffers.
    pub fn grid(&self) -> &PressureGrid {
        &self.grid
    }
}

/// Response at the extraction node to a unit impulse at the injection node.
pub fn render_impulse_response(
    config: &SolverConfig,
    length: usize,
) -> Result<Vec<f64>, ConfigurationError> {
    let mut solver = Solver::configure(config.clone())?;
    info!(
        "Rendering {} samples ({:.3} s)",
        length,
        length as f64 * config.time_step()
    );

    let mut response = Vec::with_capacity(length);
    for n in 0..length {
        let input = if n == 0 { 1.0 } else { 0.0 };
        response.push(solver.step(input));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        let solver = Solver::configure(config).unwrap();

        assert_eq!(solver.dimensions(), (10, 10, 10));
        assert_eq!(solver.coefficients().reflection, 0.95);
        assert_eq!(solver.step_count(), 0);
    }

    #[test]
    fn test_presets_configure() {
        for config in [
            SolverConfig::small_box(),
            SolverConfig::chamber(),
            SolverConfig::concrete_box(),
        ] {
            assert!(Solver::configure(config).is_ok());
        }

        let concrete = Solver::configure(SolverConfig::concrete_box()).unwrap();
        assert!(concrete.coefficients().reflection > 0.999);
    }

    #[test]
    fn test_invalid_dimensions() {
        let config = SolverConfig::default().with_dimensions(2, 10, 10);
        assert!(matches!(
            Solver::configure(config),
            Err(ConfigurationError::InvalidDimensions { nx: 2, .. })
        ));
    }

    #[test]
    fn test_nodes_must_be_interior() {
        let config = SolverConfig::default().with_injection(0, 3, 3);
        assert!(matches!(
            Solver::configure(config),
            Err(ConfigurationError::NodeOutOfBounds { role: "Injection", .. })
        ));

        let config = SolverConfig::default().with_extraction(5, 7, 10);
        assert!(matches!(
            Solver::configure(config),
            Err(ConfigurationError::NodeOutOfBounds { role: "Extraction", .. })
        ));
    }

    #[test]
    fn test_invalid_sample_rate() {
        for rate in [0.0, -44_100.0, f64::NAN] {
            let config = SolverConfig::default().with_sample_rate(rate);
            assert!(matches!(
                Solver::configure(config),
                Err(ConfigurationError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_invalid_reflection() {
        let config = SolverConfig::default().with_reflection(1.5);
        assert!(matches!(
            Solver::configure(config),
            Err(ConfigurationError::DegenerateCoefficient { .. })
        ));
    }

    #[test]
    fn test_physical_quantities() {
        let config = SolverConfig::default();
        assert!((config.time_step() - 1.0 / 48_000.0).abs() < 1e-18);
        assert_eq!(config.courant_number(), 0.5);

        // h = c·T/λ = 346 / 24000
        let h = config.cell_size();
        assert!((h - 346.0 / 24_000.0).abs() < 1e-12);

        let (w, _, _) = config.physical_dimensions();
        assert!((w - 10.0 * h).abs() < 1e-12);
        assert!((config.max_frequency() - 2_400.0).abs() < 1e-6);
    }

    #[test]
    fn test_for_room() {
        let config = SolverConfig::for_room(0.5, 0.3, 0.2, 8_000.0).unwrap();
        // h = 346 / 4000 = 0.0865 m
        assert_eq!((config.nx, config.ny, config.nz), (6, 3, 3));
        assert!(config.dims().is_ok());

        let big = SolverConfig::for_room(1.0, 1.0, 1.0, 8_000.0).unwrap();
        assert!(Solver::configure(big).is_ok());

        assert!(SolverConfig::for_room(0.0, 1.0, 1.0, 8_000.0).is_err());
        assert!(SolverConfig::for_room(1.0, 1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_oversized_room_rejected() {
        assert_eq!(
            SolverConfig::for_room(1e30, 1e30, 1e30, 48_000.0),
            Err(ConfigurationError::InvalidRoomSize(1e30))
        );
        // each axis fits, the node count does not
        assert_eq!(
            SolverConfig::for_room(1e7, 2.0, 1e7, 48_000.0),
            Err(ConfigurationError::InvalidRoomSize(1e7))
        );
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let n = 1 << 22;
        let config = SolverConfig::default().with_dimensions(n, n, n);
        assert!(matches!(
            Solver::configure(config),
            Err(ConfigurationError::InvalidDimensions { .. })
        ));

        let scaled = SolverConfig::default()
            .with_dimensions(usize::MAX, n, 3)
            .with_scaled_nodes();
        assert_eq!(scaled.injection.0, usize::MAX / 10 * 3 + 1);
        assert_eq!(scaled.extraction.0, usize::MAX / 10 * 5 + 2);
        assert_eq!(scaled.extraction.2, 1);
        assert!(scaled.dims().is_err());
    }

    #[test]
    fn test_step_and_reset() {
        let mut solver = Solver::configure(SolverConfig::small_box()).unwrap();

        solver.step(1.0);
        solver.step_n(4);
        assert_eq!(solver.step_count(), 5);
        assert!(solver.max_pressure() > 0.0);
        assert!((solver.elapsed() - 5.0 / 48_000.0).abs() < 1e-15);

        solver.reset();
        assert_eq!(solver.step_count(), 0);
        assert_eq!(solver.max_pressure(), 0.0);
        assert_eq!(solver.energy(), 0.0);
        assert_eq!(solver.coefficients().reflection, 0.95);
    }

    #[test]
    fn test_set_wall() {
        let mut solver = Solver::configure(SolverConfig::default()).unwrap();

        solver.set_wall(WallModel::Reflection(0.5)).unwrap();
        assert_eq!(solver.coefficients().edge.d2, 0.5);
        assert_eq!(solver.config().wall, WallModel::Reflection(0.5));

        assert!(solver.set_wall(WallModel::Reflection(-0.5)).is_err());
        assert_eq!(solver.coefficients().edge.d2, 0.5);
    }

    #[test]
    fn test_pressure_at() {
        let mut solver = Solver::configure(SolverConfig::small_box()).unwrap();
        solver.step(1.0);

        // One step spreads the impulse to its six neighbours
        assert_eq!(solver.pressure_at(1, 2, 2), Some(0.5));
        assert_eq!(solver.pressure_at(2, 2, 2), Some(0.25));
        assert_eq!(solver.pressure_at(6, 0, 0), None);
    }

    #[test]
    fn test_class_counts() {
        let solver = Solver::configure(SolverConfig::default()).unwrap();
        let counts = solver.class_counts();
        assert_eq!(counts[0], (NodeClass::Interior, 512));
        assert_eq!(counts[1], (NodeClass::Face, 384));
        assert_eq!(counts[2], (NodeClass::Edge, 96));
        assert_eq!(counts[3], (NodeClass::Corner, 8));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 1000);
    }

    #[test]
    fn test_render_impulse_response() {
        let config = SolverConfig::small_box();
        let response = render_impulse_response(&config, 64).unwrap();
        assert_eq!(response.len(), 64);
        assert!(response.iter().all(|s| s.is_finite()));

        let mut solver = Solver::configure(config).unwrap();
        for (n, expected) in response.iter().enumerate() {
            let got = solver.step(if n == 0 { 1.0 } else { 0.0 });
            assert_eq!(got, *expected);
        }
    }

    #[test]
    fn test_scaled_nodes_stay_interior() {
        for n in [3, 4, 5, 10, 37] {
            let config = SolverConfig::default()
                .with_dimensions(n, n, n)
                .with_scaled_nodes();
            assert!(Solver::configure(config).is_ok(), "n = {}", n);
        }
    }
}
