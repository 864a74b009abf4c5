//! Fuzz target for solver configuration and stepping.
//!
//! Random grids, walls, node positions and input sequences. Configuration
//! may fail but must never panic; a configured solver must stay finite and
//! return to exact silence after a reset.

#![no_main]

use arbitrary::Arbitrary;
use fdtd_reverb::simulation::{InjectionMode, Solver, SolverConfig, WallModel};
use libfuzzer_sys::fuzz_target;

/// Fuzz input: room layout and input samples.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    dims: (u8, u8, u8),
    injection: (u8, u8, u8),
    extraction: (u8, u8, u8),
    /// Reflection coefficient in hundredths, offset so negatives occur.
    reflection: u8,
    differential: bool,
    samples: Vec<i16>,
}

fuzz_target!(|input: FuzzInput| {
    if input.samples.len() > 256 {
        return;
    }

    let axis = |v: u8| usize::from(v % 14);
    let r = (f64::from(input.reflection) - 20.0) / 100.0;
    let mode = if input.differential {
        InjectionMode::Differential
    } else {
        InjectionMode::Additive
    };

    let config = SolverConfig::default()
        .with_dimensions(axis(input.dims.0), axis(input.dims.1), axis(input.dims.2))
        .with_injection(
            axis(input.injection.0),
            axis(input.injection.1),
            axis(input.injection.2),
        )
        .with_extraction(
            axis(input.extraction.0),
            axis(input.extraction.1),
            axis(input.extraction.2),
        )
        .with_wall(WallModel::Reflection(r))
        .with_injection_mode(mode);

    let Ok(mut solver) = Solver::configure(config) else {
        return;
    };
    assert!((0.0..=1.0).contains(&r), "accepted reflection {}", r);

    for &s in &input.samples {
        let out = solver.step(f64::from(s) / 32768.0);
        assert!(out.is_finite(), "non-finite output");
    }

    solver.reset();
    for _ in 0..8 {
        assert_eq!(solver.step(0.0), 0.0);
    }
});
