//! FDTD Reverb - room reverberation from a 3D wave simulation
//!
//! The reverb simulates acoustic pressure in a rectangular box with an
//! explicit finite-difference time-domain scheme and plays back the pressure
//! at one node. Every audio sample advances the simulation by one step.
//!
//! # Features
//!
//! - **Boundary-aware stencils**: every node is classified as interior,
//!   face, edge or corner; each class has its own update coefficients
//!
//! - **Wall physics**:
//!   - Reflection coefficient given directly or from wall material impedance
//!   - Temperature-dependent air, water and common wall materials
//!
//! - **Real-time friendly**: no allocation, locking or error path per step;
//!   the three pressure buffers rotate instead of being copied
//!
//! - **Audio**:
//!   - Multichannel block processor with one solver per channel
//!   - Impulse response rendering and WAV I/O
//!
//! # Example
//!
//! ```rust
//! use fdtd_reverb::prelude::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SolverConfig::default().with_reflection(0.9);
//! let mut solver = Solver::configure(config)?;
//!
//! let mut output = Vec::new();
//! output.push(solver.step(1.0));
//! for _ in 0..100 {
//!     output.push(solver.step(0.0));
//! }
//!
//! println!("Simulated {} seconds", solver.elapsed());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Modules
//!
//! - [`simulation`]: Solver, grid, stencils and physics
//! - [`audio`]: Block processor and WAV files
//! - [`error`]: Error types

pub mod audio;
pub mod error;
pub mod simulation;

/// Re-exports for convenient access.
pub mod prelude {
    pub use crate::audio::{load_wav, save_wav, FdtdReverb, WavAudio};
    pub use crate::error::{ConfigurationError, ReverbError};
    pub use crate::simulation::{
        render_impulse_response, GridDims, InjectionMode, MediumProperties, NodeClass,
        SchemeCoefficients, Solver, SolverConfig, WallModel,
    };
}

pub use prelude::*;
