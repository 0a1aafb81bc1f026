//! qudi-analysis - Command Line Entry Point
//!
//! Runs sine-family fits and spectra on two-column measurement files.

use anyhow::Context;
use clap::{Parser, Subcommand};
use qudi_analysis::{
    analysis::Spectrum,
    config::AnalysisConfig,
    data::{load_xy, write_csv},
    FitKind, FitLogic, FtOptions, Units, WindowFunction,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "qudi-analysis", version, about = "Sine-family fitting for measurement data")]
struct Cli {
    /// Config file (TOML or JSON); defaults to the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available fits
    List,

    /// Fit a two-column data file
    Fit {
        /// Fit name, see `list`
        name: String,
        /// Data file with x and y columns
        file: PathBuf,
        /// Unit of the x column
        #[arg(long)]
        x_unit: Option<String>,
        /// Unit of the y column
        #[arg(long)]
        y_unit: Option<String>,
        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the amplitude spectrum of a two-column data file as CSV
    Ft {
        file: PathBuf,
        /// Window function applied before the transform
        #[arg(long, default_value = "none")]
        window: String,
        /// Number of signal lengths of zeros appended
        #[arg(long, default_value_t = 0)]
        zeropad: usize,
        /// Output the power spectral density
        #[arg(long)]
        psd: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,qudi_analysis=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::load_or_default(AnalysisConfig::default_path()),
    };

    match cli.command {
        Command::List => {
            for kind in FitKind::all() {
                println!("{}", kind);
            }
        }
        Command::Fit {
            name,
            file,
            x_unit,
            y_unit,
            json,
        } => {
            let kind: FitKind = name.parse()?;
            let (x, y) = load_xy(&file)?;
            tracing::info!("Fitting {} points from {:?} with {}", x.len(), file, kind);

            let defaults = config.units.clone();
            let units = Units::new(
                x_unit.unwrap_or(defaults.x),
                y_unit.unwrap_or(defaults.y),
            );
            let logic = FitLogic::with_config(config);
            let result = logic
                .fit(kind, &x, &y, Some(&units), None)
                .with_context(|| format!("{} fit of {}", kind, file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{} fit: {}", kind, result.message);
                println!("reduced chi-square: {:e}", result.redchi);
                print!("{}", result.report);
            }
        }
        Command::Ft {
            file,
            window,
            zeropad,
            psd,
        } => {
            if WindowFunction::from_name(&window).is_none() {
                tracing::warn!("Unknown window '{}', using no window", window);
            }
            let (x, y) = load_xy(&file)?;
            let options = FtOptions::with_zeropad(zeropad).window(window).psd(psd);
            let spectrum = Spectrum::compute(&x, &y, &options);
            if let Some((frequency, magnitude)) = spectrum.peak() {
                tracing::info!("Peak at {} with magnitude {}", frequency, magnitude);
            }
            let header = if psd { "psd" } else { "magnitude" };
            write_csv(
                std::io::stdout().lock(),
                &["frequency", header],
                &[&spectrum.frequencies, &spectrum.magnitudes],
            )?;
        }
    }

    Ok(())
}
