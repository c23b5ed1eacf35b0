use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use mandala_core::{AppConfig, MandalaError, MandalaState, ParameterUpdate};
use tracing_subscriber::EnvFilter;

fn main() -> mandala_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { output, options } => run_render(&output, &options),
        Commands::Animate {
            out_dir,
            frames,
            fps,
            animation_ms,
            options,
        } => run_animate(&out_dir, frames, fps, animation_ms, &options),
        Commands::Config => {
            println!("{}", AppConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn run_render(output: &Path, options: &GenerateOptions) -> mandala_core::Result<()> {
    let mut mandala = build_mandala(options, None)?;
    mandala.regenerate()?;

    let is_png = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        mandala.export_png(output)?;
    } else {
        std::fs::write(output, mandala.to_svg())?;
    }
    tracing::info!(?output, seed = mandala.seed(), "wrote mandala");
    Ok(())
}

fn run_animate(
    out_dir: &Path,
    frames: u32,
    fps: u32,
    animation_ms: Option<u64>,
    options: &GenerateOptions,
) -> mandala_core::Result<()> {
    if fps == 0 {
        return Err(MandalaError::msg("fps must be at least 1"));
    }
    let mut mandala = build_mandala(options, animation_ms)?;
    mandala.regenerate()?;
    mandala.start_animation()?;

    std::fs::create_dir_all(out_dir)?;
    let frame_time = Duration::from_secs_f64(1.0 / fps as f64);
    tracing::info!(?out_dir, frames, fps, seed = mandala.seed(), "rendering animation frames");

    for frame in 0..frames {
        if frame > 0 {
            mandala.advance(frame_time)?;
        }
        let path = out_dir.join(format!("frame_{frame:05}.svg"));
        std::fs::write(&path, mandala.to_svg())?;
    }

    tracing::info!(steps = mandala.animation_steps(), "animation finished");
    Ok(())
}

fn build_mandala(
    options: &GenerateOptions,
    animation_ms: Option<u64>,
) -> mandala_core::Result<MandalaState> {
    let mut config = match &options.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if options.seed.is_some() {
        config.seed = options.seed;
    }

    let mut mandala = MandalaState::new(&config)?;
    let mut update = ParameterUpdate {
        animation_time_ms: animation_ms,
        ..Default::default()
    };
    if options.fill {
        update.do_fill = Some(true);
    }
    if let Some((min, max)) = options.lines {
        update.line_count_min = Some(min);
        update.line_count_max = Some(max);
    }
    if let Some((min, max)) = options.points {
        update.curve_points_min = Some(min);
        update.curve_points_max = Some(max);
    }
    if let Some((min, max)) = options.repetitions {
        update.radial_repetitions_min = Some(min);
        update.radial_repetitions_max = Some(max);
    }
    if !update.is_empty() {
        mandala.set_parameters(&update)?;
    }
    Ok(mandala)
}

/// Parses `N` or `MIN-MAX`.
fn parse_range(value: &str) -> Result<(u32, u32), String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|err| format!("`{part}` is not a count: {err}"))
    };
    match value.split_once('-') {
        Some((min, max)) => Ok((parse(min)?, parse(max)?)),
        None => {
            let n = parse(value)?;
            Ok((n, n))
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Random radially symmetric Bezier mandalas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one mandala and write it as SVG, or PNG for a `.png` output.
    Render {
        output: PathBuf,
        #[command(flatten)]
        options: GenerateOptions,
    },
    /// Generate a mandala, animate it and write numbered SVG frames.
    Animate {
        out_dir: PathBuf,
        /// Number of frames to write.
        #[arg(long, default_value_t = 120)]
        frames: u32,
        #[arg(long, default_value_t = 30)]
        fps: u32,
        /// Length of one animation step in milliseconds.
        #[arg(long)]
        animation_ms: Option<u64>,
        #[command(flatten)]
        options: GenerateOptions,
    },
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args, Debug)]
struct GenerateOptions {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    seed: Option<u64>,
    /// Fill curves with their contrasting colour.
    #[arg(long)]
    fill: bool,
    /// Line count range, `N` or `MIN-MAX`.
    #[arg(long, value_parser = parse_range)]
    lines: Option<(u32, u32)>,
    /// Points per curve, `N` or `MIN-MAX`.
    #[arg(long, value_parser = parse_range)]
    points: Option<(u32, u32)>,
    /// Radial repetitions, `N` or `MIN-MAX`.
    #[arg(long, value_parser = parse_range)]
    repetitions: Option<(u32, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_counts_and_ranges() {
        assert_eq!(parse_range("4"), Ok((4, 4)));
        assert_eq!(parse_range("3-7"), Ok((3, 7)));
        assert_eq!(parse_range(" 2 - 5 "), Ok((2, 5)));
        assert!(parse_range("a-3").is_err());
        assert!(parse_range("-3").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
