mod error_formatter;
mod formatter;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use formatter::Formatter;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tenet::Engine;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tenet")]
#[command(about = "Fill in what the formulas already know.")]
#[command(
    long_about = "Tenet loads classes, formulas and components from a JSON declaration file and computes unknown component fields.\nFormulas are solved for whichever of their variables is unknown and chained through fields that were themselves computed."
)]
#[command(version)]
struct Cli {
    /// Log candidate formulas and bindings to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute one unknown field (format: component.field)
    ///
    /// Every formula of the knowledge base is tried until one can compute the
    /// field. The value is printed with the equation that produced it.
    Fill {
        /// Declaration file (JSON)
        file: PathBuf,
        /// Component label and field name
        ///
        /// Examples:
        ///   rock.mass        - the mass of the component labelled rock
        #[arg(value_name = "COMPONENT.FIELD")]
        target: String,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fill every field some formula can compute
    ///
    /// Repeats over all unknown fields until a pass fills nothing new.
    Solve {
        /// Declaration file (JSON)
        file: PathBuf,
        /// Print the resolutions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the component graph with known and unknown fields
    Show {
        /// Declaration file (JSON)
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Fill { file, target, json } => fill_command(file, target, *json),
        Commands::Solve { file, json } => solve_command(file, *json),
        Commands::Show { file } => show_command(file),
    };

    if let Err(e) = result {
        if let Some(tenet_err) = e.downcast_ref::<tenet::TenetError>() {
            eprintln!("{}", error_formatter::format_error(tenet_err));
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tenet=debug" } else { "tenet=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .init();
}

fn fill_command(file: &Path, target: &str, json: bool) -> Result<()> {
    let mut engine = load(file)?;
    let (label, field) = target
        .split_once('.')
        .ok_or_else(|| anyhow!("Target '{}' is not of the form component.field", target))?;

    let component = engine.component_by_label(label)?;
    let resolution = engine.fill(component, field)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print!("{}", Formatter::default().format_resolution(&engine, &resolution));
    }
    Ok(())
}

fn solve_command(file: &Path, json: bool) -> Result<()> {
    let mut engine = load(file)?;
    let resolutions = engine.solve()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolutions)?);
    } else {
        print!("{}", Formatter::default().format_solution(&engine, &resolutions));
    }
    Ok(())
}

fn show_command(file: &Path) -> Result<()> {
    let engine = load(file)?;
    print!("{}", Formatter::default().format_system(&engine));
    Ok(())
}

fn load(file: &Path) -> Result<Engine> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Cannot read declarations from {}", file.display()))?;
    let mut engine = Engine::new();
    engine.load_json(&json)?;
    Ok(engine)
}
