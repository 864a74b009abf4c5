//! fdtd-render - offline rendering with the FDTD room reverb.
//!
//! # Commands
//!
//! - `fdtd-render impulse <out.wav>` - Render the room's impulse response
//! - `fdtd-render process <in.wav> <out.wav>` - Run a WAV file through the reverb
//!
//! # Examples
//!
//! ```bash
//! # One second impulse response of a 2m x 1.5m x 1m room at 16 kHz
//! fdtd-render impulse ir.wav --room 2,1.5,1 --sample-rate 16000 --seconds 1
//!
//! # Concrete walls, half wet
//! fdtd-render process dry.wav wet.wav --wall concrete --mix 0.5
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fdtd_reverb::audio::{load_wav, normalize, save_wav, FdtdReverb};
use fdtd_reverb::error::Result;
use fdtd_reverb::simulation::{
    render_impulse_response, InjectionMode, MediumProperties, SolverConfig, WallModel,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Offline renderer for the FDTD room reverb
#[derive(Parser)]
#[command(name = "fdtd-render")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the impulse response between the injection and extraction nodes
    Impulse {
        /// Output WAV file
        output: PathBuf,

        /// Sample rate (Hz)
        #[arg(short, long, default_value = "48000")]
        sample_rate: u32,

        /// Length of the response (seconds)
        #[arg(long, default_value = "1.0", value_parser = parse_seconds)]
        seconds: f64,

        /// Scale the response to a peak of 1.0
        #[arg(long)]
        normalize: bool,

        #[command(flatten)]
        room: RoomArgs,
    },

    /// Process a WAV file through the reverb, one solver per channel
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Wet/dry mix (0 = dry, 1 = wet)
        #[arg(long, default_value = "1.0", value_parser = parse_mix)]
        mix: f32,

        /// Silence appended to let the tail ring out (seconds)
        #[arg(long, default_value = "0.0", value_parser = parse_seconds)]
        tail: f64,

        #[command(flatten)]
        room: RoomArgs,
    },
}

#[derive(Args)]
struct RoomArgs {
    /// Grid size in nodes, as nx,ny,nz
    #[arg(long, value_parser = parse_triple::<usize>, default_value = "10,10,10")]
    grid: (usize, usize, usize),

    /// Physical room size in meters, as width,height,depth (overrides --grid)
    #[arg(long, value_parser = parse_triple::<f64>)]
    room: Option<(f64, f64, f64)>,

    /// Wall reflection coefficient in [0, 1]
    #[arg(short, long, default_value = "0.95")]
    reflection: f64,

    /// Wall material (overrides --reflection)
    #[arg(short, long, value_enum)]
    wall: Option<Material>,

    /// Injection node, as i,j,k
    #[arg(long, value_parser = parse_triple::<usize>)]
    injection: Option<(usize, usize, usize)>,

    /// Extraction node, as i,j,k
    #[arg(long, value_parser = parse_triple::<usize>)]
    extraction: Option<(usize, usize, usize)>,

    /// Cancel the source's DC component
    #[arg(long)]
    differential: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Material {
    Concrete,
    Brick,
    Wood,
    Glass,
}

impl Material {
    fn properties(self) -> MediumProperties {
        match self {
            Material::Concrete => MediumProperties::concrete(),
            Material::Brick => MediumProperties::brick(),
            Material::Wood => MediumProperties::wood(),
            Material::Glass => MediumProperties::glass(),
        }
    }
}

fn parse_triple<T: FromStr>(s: &str) -> std::result::Result<(T, T, T), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(format!("expected three comma-separated values, got '{}'", s));
    };
    let parse = |v: &str| v.parse::<T>().map_err(|_| format!("invalid value '{}'", v));
    Ok((parse(*a)?, parse(*b)?, parse(*c)?))
}

fn parse_mix(s: &str) -> std::result::Result<f32, String> {
    let mix: f32 = s.parse().map_err(|_| format!("invalid mix '{}'", s))?;
    if !(0.0..=1.0).contains(&mix) {
        return Err(format!("mix must lie in [0, 1], got {}", mix));
    }
    Ok(mix)
}

/// Longest duration accepted for rendered or appended audio.
const MAX_SECONDS: f64 = 3600.0;

fn parse_seconds(s: &str) -> std::result::Result<f64, String> {
    let seconds: f64 = s.parse().map_err(|_| format!("invalid duration '{}'", s))?;
    if !(0.0..=MAX_SECONDS).contains(&seconds) {
        return Err(format!(
            "duration must lie in [0, {}] seconds, got {}",
            MAX_SECONDS, seconds
        ));
    }
    Ok(seconds)
}

impl RoomArgs {
    fn config(&self, sample_rate: f64) -> Result<SolverConfig> {
        let mut config = match self.room {
            Some((w, h, d)) => SolverConfig::for_room(w, h, d, sample_rate)?,
            None => {
                let (nx, ny, nz) = self.grid;
                SolverConfig::default()
                    .with_sample_rate(sample_rate)
                    .with_dimensions(nx, ny, nz)
                    .with_scaled_nodes()
            }
        };

        config = match self.wall {
            Some(material) => config.with_wall(WallModel::Material(material.properties())),
            None => config.with_reflection(self.reflection),
        };
        if let Some((i, j, k)) = self.injection {
            config = config.with_injection(i, j, k);
        }
        if let Some((i, j, k)) = self.extraction {
            config = config.with_extraction(i, j, k);
        }
        if self.differential {
            config = config.with_injection_mode(InjectionMode::Differential);
        }
        Ok(config)
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn impulse(
    output: &Path,
    sample_rate: u32,
    seconds: f64,
    normalize_peak: bool,
    room: &RoomArgs,
) -> Result<()> {
    let config = room.config(f64::from(sample_rate))?;
    let (w, h, d) = config.physical_dimensions();
    info!("Room {:.2} m x {:.2} m x {:.2} m", w, h, d);

    let length = (seconds * f64::from(sample_rate)).round() as usize;
    let response = render_impulse_response(&config, length)?;

    let mut samples: Vec<f32> = response.iter().map(|&s| s as f32).collect();
    if normalize_peak {
        normalize(&mut samples, 1.0);
    }
    save_wav(output, &[samples], sample_rate)
}

fn process(input: &Path, output: &Path, mix: f32, tail: f64, room: &RoomArgs) -> Result<()> {
    let audio = load_wav(input)?;
    let sample_rate = audio.sample_rate;
    let tail_len = (tail * f64::from(sample_rate)).round() as usize;

    let mut reverb = FdtdReverb::new(room.config(f64::from(sample_rate))?);
    reverb.prepare(f64::from(sample_rate), audio.channels.len())?;

    let dry: Vec<Vec<f32>> = audio
        .channels
        .into_iter()
        .map(|mut ch| {
            ch.resize(ch.len() + tail_len, 0.0);
            ch
        })
        .collect();

    let mut wet = dry.clone();
    {
        let mut slices: Vec<&mut [f32]> = wet.iter_mut().map(Vec::as_mut_slice).collect();
        reverb.process_block(&mut slices)?;
    }

    let mixed: Vec<Vec<f32>> = dry
        .iter()
        .zip(&wet)
        .map(|(d, w)| {
            d.iter()
                .zip(w)
                .map(|(d, w)| (1.0 - mix) * d + mix * w)
                .collect()
        })
        .collect();

    save_wav(output, &mixed, sample_rate)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Impulse {
            output,
            sample_rate,
            seconds,
            normalize,
            room,
        } => impulse(output, *sample_rate, *seconds, *normalize, room),

        Commands::Process {
            input,
            output,
            mix,
            tail,
            room,
        } => process(input, output, *mix, *tail, room),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1.5"), Ok(1.5));
        assert_eq!(parse_seconds("0"), Ok(0.0));
        assert_eq!(parse_seconds("3600"), Ok(MAX_SECONDS));

        for bad in ["inf", "-inf", "NaN", "-1", "1e30", "3600.5", "ten"] {
            assert!(parse_seconds(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_duration_flags_validated() {
        assert!(Cli::try_parse_from(["fdtd-render", "impulse", "ir.wav", "--seconds", "2"]).is_ok());
        assert!(Cli::try_parse_from(["fdtd-render", "impulse", "ir.wav", "--seconds", "inf"]).is_err());
        assert!(
            Cli::try_parse_from(["fdtd-render", "process", "a.wav", "b.wav", "--tail", "1e30"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_mix() {
        assert_eq!(parse_mix("0.5"), Ok(0.5));
        assert!(parse_mix("1.5").is_err());
        assert!(parse_mix("NaN").is_err());
    }

    #[test]
    fn test_parse_triple() {
        assert_eq!(parse_triple::<usize>("4, 5,6"), Ok((4, 5, 6)));
        assert!(parse_triple::<usize>("4,5").is_err());
        assert!(parse_triple::<f64>("1,x,2").is_err());
    }
}
