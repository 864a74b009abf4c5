//! Error types for the FDTD reverb.

use thiserror::Error;

/// Result type for reverb operations.
pub type Result<T> = std::result::Result<T, ReverbError>;

/// Reasons a solver configuration is rejected.
///
/// All of these surface from configuration only. Once a
/// [`Solver`](crate::simulation::Solver) exists, stepping it cannot fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A grid dimension is below 3, so the node classes would overlap.
    #[error("Invalid grid dimensions {nx}x{ny}x{nz}: every dimension must be at least 3")]
    InvalidDimensions {
        /// Requested size along x.
        nx: usize,
        /// Requested size along y.
        ny: usize,
        /// Requested size along z.
        nz: usize,
    },

    /// The reflection coefficient cannot produce a usable scheme.
    #[error("Degenerate scheme coefficient for R = {reflection}: {reason}")]
    DegenerateCoefficient {
        /// Offending reflection coefficient.
        reflection: f64,
        /// What went wrong.
        reason: String,
    },

    /// An injection or extraction node is not strictly inside the grid.
    #[error("{role} node ({i}, {j}, {k}) is not an interior node of the grid")]
    NodeOutOfBounds {
        /// "Injection" or "Extraction".
        role: &'static str,
        /// x coordinate.
        i: usize,
        /// y coordinate.
        j: usize,
        /// z coordinate.
        k: usize,
    },

    /// Sample rate is zero, negative or not finite.
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    /// A room length is zero, negative or not finite.
    #[error("Invalid room size: {0} m")]
    InvalidRoomSize(f64),
}

impl ConfigurationError {
    /// Create a degenerate coefficient error.
    pub fn degenerate(reflection: f64, reason: impl Into<String>) -> Self {
        Self::DegenerateCoefficient {
            reflection,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the block processor, renderer and WAV helpers.
#[derive(Error, Debug)]
pub enum ReverbError {
    /// Configuration was rejected.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Audio was processed before `prepare`.
    #[error("Reverb used before prepare()")]
    NotPrepared,

    /// More channels were supplied than were prepared.
    #[error("Channel mismatch: prepared {prepared}, got {got}")]
    ChannelMismatch {
        /// Channels set up by `prepare`.
        prepared: usize,
        /// Channels passed to `process_block`.
        got: usize,
    },

    /// WAV read or write failure.
    #[error("WAV error: {0}")]
    Wav(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReverbError {
    /// Create a WAV error.
    pub fn wav(msg: impl Into<String>) -> Self {
        Self::Wav(msg.into())
    }
}

impl From<hound::Error> for ReverbError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ReverbError::Io(io),
            other => ReverbError::Wav(other.to_string()),
        }
    }
}
