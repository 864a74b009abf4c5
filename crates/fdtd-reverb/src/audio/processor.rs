//! Multichannel block processor.
//!
//! Wraps one [`Solver`] per channel. A host calls [`FdtdReverb::prepare`]
//! once it knows the sample rate and channel layout, then
//! [`FdtdReverb::process_block`] for every audio block.

use crate::error::{Result, ReverbError};
use crate::simulation::{Solver, SolverConfig, WallModel};
use tracing::{debug, info};

/// Room reverb effect over planar (one slice per channel) audio buffers.
pub struct FdtdReverb {
    config: SolverConfig,
    solvers: Vec<Solver>,
    prepared: bool,
}

impl FdtdReverb {
    /// Create an unprepared reverb. The sample rate in `config` is replaced
    /// by the one passed to [`prepare`](Self::prepare).
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            solvers: Vec::new(),
            prepared: false,
        }
    }

    /// Configure one independent solver per channel.
    ///
    /// Any previous state is discarded. On error the reverb is left
    /// unprepared and its configuration is unchanged.
    pub fn prepare(&mut self, sample_rate: f64, channels: usize) -> Result<()> {
        self.release();
        let config = self.config.clone().with_sample_rate(sample_rate);

        let solvers = (0..channels)
            .map(|_| Solver::configure(config.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            "Prepared reverb: {} channels at {} Hz",
            channels, sample_rate
        );
        self.config = config;
        self.solvers = solvers;
        self.prepared = true;
        Ok(())
    }

    /// Process a block in place, one slice per channel.
    ///
    /// Fewer channels than prepared is fine; the remaining solvers idle.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) -> Result<()> {
        if !self.prepared {
            return Err(ReverbError::NotPrepared);
        }
        if channels.len() > self.solvers.len() {
            return Err(ReverbError::ChannelMismatch {
                prepared: self.solvers.len(),
                got: channels.len(),
            });
        }

        for (solver, samples) in self.solvers.iter_mut().zip(channels.iter_mut()) {
            solver.process_in_place(samples);
        }
        Ok(())
    }

    /// Silence every channel's field.
    pub fn reset(&mut self) {
        for solver in &mut self.solvers {
            solver.reset();
        }
    }

    /// Drop all solvers. The reverb must be prepared again before use.
    pub fn release(&mut self) {
        if self.prepared {
            debug!("Releasing {} solvers", self.solvers.len());
        }
        self.solvers.clear();
        self.prepared = false;
    }

    /// Change the walls on every channel.
    ///
    /// The coefficients are derived once; either all channels switch or,
    /// on error, none do.
    pub fn set_wall(&mut self, wall: WallModel) -> Result<()> {
        let candidate = self.config.clone().with_wall(wall);
        let coefficients = candidate.scheme_coefficients()?;

        for solver in &mut self.solvers {
            solver.install_wall(wall, coefficients);
        }
        self.config = candidate;
        Ok(())
    }

    /// Whether [`prepare`](Self::prepare) has succeeded since the last release.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Number of prepared channels.
    pub fn channels(&self) -> usize {
        self.solvers.len()
    }

    /// Solver driving one channel.
    pub fn solver(&self, channel: usize) -> Option<&Solver> {
        self.solvers.get(channel)
    }

    /// Current configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}
