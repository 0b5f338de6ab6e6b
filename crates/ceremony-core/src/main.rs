//! Ceremony runner
//!
//! Loads configuration, applies command line overrides and runs one ceremony
//! against the wall clock, rendering to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ceremony_core::config::default_config_toml;
use ceremony_core::export::write_jsonl;
use ceremony_core::{
    CeremonyConfig, CeremonyDriver, CeremonyVariant, HistoryRecord, Result, SystemClock,
};
use ceremony_events::VariantKind;

mod render;

use render::{print_collapse_summary, print_decay_summary, ConsoleRenderer};

/// Command line arguments for the ceremony
#[derive(Parser, Debug)]
#[command(name = "ceremony")]
#[command(about = "A timed ceremony of stochastic events")]
struct Args {
    /// Ceremony variant: collapse or decay
    #[arg(long)]
    variant: Option<VariantKind>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Free-text intention that resonance echoes may answer
    #[arg(long)]
    intention: Option<String>,

    /// Ambient phase length in seconds (0 skips it)
    #[arg(long)]
    ambient_secs: Option<f64>,

    /// Active phase length in seconds
    #[arg(long)]
    active_secs: Option<f64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the history as JSON Lines to this path
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    summary_json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

impl Args {
    /// File values first, flags on top.
    fn load_config(&self) -> Result<CeremonyConfig> {
        let mut config = match &self.config {
            Some(path) => CeremonyConfig::from_file(path)?,
            None => CeremonyConfig::default(),
        };

        let general = &mut config.ceremony;
        if let Some(variant) = self.variant {
            general.variant = variant;
        }
        if let Some(seed) = self.seed {
            general.seed = Some(seed);
        }
        if let Some(intention) = &self.intention {
            general.intention = Some(intention.clone());
        }
        if let Some(secs) = self.ambient_secs {
            general.ambient_secs = secs;
        }
        if let Some(secs) = self.active_secs {
            general.active_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", default_config_toml());
        return ExitCode::SUCCESS;
    }

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "ceremony failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.load_config()?;
    match config.ceremony.variant {
        VariantKind::Collapse => {
            let summary = run_variant(args, &config, config.collapse_ceremony()?)?;
            if args.summary_json {
                print_json(&summary)?;
            } else {
                print_collapse_summary(&summary);
            }
        }
        VariantKind::Decay => {
            let summary = run_variant(args, &config, config.decay_ceremony()?)?;
            if args.summary_json {
                print_json(&summary)?;
            } else {
                print_decay_summary(&summary);
            }
        }
    }
    Ok(())
}

fn run_variant<V>(args: &Args, config: &CeremonyConfig, variant: V) -> Result<V::Summary>
where
    V: CeremonyVariant,
    V::Record: HistoryRecord + Serialize,
{
    let renderer = ConsoleRenderer::stdout(config.decay.baseline);
    let mut driver = CeremonyDriver::new(variant, config.variates(), SystemClock::new(), config.plan()?)?
        .with_observer(Box::new(renderer))
        .with_top_n(config.ceremony.top_n);

    driver.run()?;

    if let Some(path) = &args.export {
        write_jsonl(driver.history(), path)?;
    }
    Ok(driver.summary())
}

fn print_json<T: Serialize>(summary: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(std::io::Error::from)?;
    println!("{}", json);
    Ok(())
}
