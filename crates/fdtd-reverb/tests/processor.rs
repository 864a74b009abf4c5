//! Integration tests for the block processor and WAV pipeline.

use fdtd_reverb::prelude::*;

fn impulse(len: usize) -> Vec<f32> {
    let mut samples = vec![0.0; len];
    samples[0] = 1.0;
    samples
}

/// Each channel runs its own room; silence in one stays silent.
#[test]
fn test_channels_are_independent() {
    let config = SolverConfig::small_box();
    let mut reverb = FdtdReverb::new(config.clone());
    reverb.prepare(48_000.0, 2).unwrap();

    let mut left = impulse(256);
    let mut right = vec![0.0_f32; 256];
    reverb
        .process_block(&mut [&mut left[..], &mut right[..]])
        .unwrap();

    assert!(right.iter().all(|s| *s == 0.0));

    let expected = render_impulse_response(&config, 256).unwrap();
    for (got, want) in left.iter().zip(&expected) {
        assert_eq!(*got, *want as f32);
    }
}

/// Output does not depend on how the stream is cut into blocks.
#[test]
fn test_block_size_invariance() {
    let input: Vec<f32> = (0..600).map(|n| ((n * 37 % 101) as f32 / 50.0) - 1.0).collect();

    let mut whole = input.clone();
    let mut reverb = FdtdReverb::new(SolverConfig::default());
    reverb.prepare(44_100.0, 1).unwrap();
    reverb.process_block(&mut [&mut whole[..]]).unwrap();

    let mut pieces = input;
    let mut reverb = FdtdReverb::new(SolverConfig::default());
    reverb.prepare(44_100.0, 1).unwrap();
    for chunk in pieces.chunks_mut(97) {
        reverb.process_block(&mut [chunk]).unwrap();
    }

    assert_eq!(whole, pieces);
}

/// Reset silences every channel without re-preparing.
#[test]
fn test_reset_between_blocks() {
    let mut reverb = FdtdReverb::new(SolverConfig::small_box());
    reverb.prepare(48_000.0, 1).unwrap();

    let mut first = impulse(64);
    reverb.process_block(&mut [&mut first[..]]).unwrap();

    reverb.reset();
    let mut silent = vec![0.0_f32; 64];
    reverb.process_block(&mut [&mut silent[..]]).unwrap();
    assert!(silent.iter().all(|s| *s == 0.0));

    let mut again = impulse(64);
    reverb.process_block(&mut [&mut again[..]]).unwrap();
    assert_eq!(first, again);
}

/// Processing a WAV file through the reverb and writing the result.
#[test]
fn test_wav_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("dry.wav");
    let output_path = dir.path().join("wet.wav");

    save_wav(&input_path, &[impulse(480), vec![0.0; 480]], 48_000).unwrap();

    let audio = load_wav(&input_path).unwrap();
    assert_eq!(audio.channels.len(), 2);

    let mut reverb = FdtdReverb::new(SolverConfig::default());
    reverb
        .prepare(f64::from(audio.sample_rate), audio.channels.len())
        .unwrap();

    let mut channels = audio.channels;
    {
        let mut slices: Vec<&mut [f32]> = channels.iter_mut().map(Vec::as_mut_slice).collect();
        reverb.process_block(&mut slices).unwrap();
    }
    save_wav(&output_path, &channels, 48_000).unwrap();

    let wet = load_wav(&output_path).unwrap();
    assert_eq!(wet.len(), 480);
    assert_eq!(wet.channels, channels);
    assert!(wet.channels[0].iter().any(|s| *s != 0.0));
    assert!(wet.channels[1].iter().all(|s| *s == 0.0));
}

/// Wall changes apply to running channels without clearing them.
#[test]
fn test_set_wall_while_running() {
    let mut reverb = FdtdReverb::new(SolverConfig::default());
    reverb.prepare(48_000.0, 1).unwrap();

    let mut block = impulse(32);
    reverb.process_block(&mut [&mut block[..]]).unwrap();
    let pressure = reverb.solver(0).unwrap().max_pressure();

    reverb
        .set_wall(WallModel::Material(MediumProperties::concrete()))
        .unwrap();
    let solver = reverb.solver(0).unwrap();
    assert_eq!(solver.max_pressure(), pressure);
    assert!(solver.coefficients().reflection > 0.999);
}
