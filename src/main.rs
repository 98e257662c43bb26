//! ginconf CLI - resolve and inspect binding files

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use ginconf::{apply, maze, render, ConfigError, FixSuggestion, Loader, LoaderOptions, ResolvedConfiguration};

#[derive(Parser)]
#[command(name = "ginconf")]
#[command(about = "Resolve scope.parameter = value binding files for training runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct LoadArgs {
    /// Path to the binding file
    file: PathBuf,

    /// Extra binding applied after the file (repeatable)
    #[arg(short, long = "bind", value_name = "BINDING")]
    bindings: Vec<String>,

    /// Directory searched for include "..." targets (repeatable)
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a binding file and bind it against the maze training scopes
    Validate {
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Print the operative configuration
    Show {
        #[command(flatten)]
        load: LoadArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Yaml,
}

fn main() {
    // Logs go to stderr so `show` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { load } => validate(&load),
        Commands::Show { load, format } => show(&load, format),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<ConfigError>().and_then(|c| c.fix_suggestion()) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn resolve(load: &LoadArgs) -> Result<(ginconf::Registry, ResolvedConfiguration), ConfigError> {
    // --include-dir entries are searched before GINCONF_INCLUDE_PATH
    let mut search_paths = load.include_dirs.clone();
    search_paths.extend(LoaderOptions::from_env().search_paths);
    let loader = Loader::new(LoaderOptions {
        search_paths,
        overrides: load.bindings.clone(),
    });

    let registry = maze::registry()?;
    let statements = loader.load_file(&load.file)?;
    let resolved = apply(&statements, &registry)?;
    Ok((registry, resolved))
}

fn validate(load: &LoadArgs) -> anyhow::Result<()> {
    let (mut registry, resolved) = resolve(load)?;
    registry.bind_defaults(&resolved);
    let run = maze::MazeTrainingRun::from_registry(&registry)?;

    println!("{} '{}' is valid", "✓".green(), load.file.display());
    println!(
        "  {} bindings across {} scopes",
        resolved.len(),
        resolved.scope_count()
    );
    println!(
        "  training_loop: batch_size_per_device={} max_iterations={} learning_rate={}",
        run.training_loop.batch_size_per_device,
        run.training_loop
            .max_iterations
            .map(|n| n.to_string())
            .unwrap_or_else(|| "None".into()),
        run.training_loop.learning_rate_schedule.learning_rate
    );
    println!(
        "  automaton: num_intermediate_states={} num_out_edges={}",
        run.automaton.num_intermediate_states, run.automaton.num_out_edges
    );
    Ok(())
}

fn show(load: &LoadArgs, format: Format) -> anyhow::Result<()> {
    let (_, resolved) = resolve(load)?;
    let output = match format {
        Format::Text => render::operative_config(&resolved),
        Format::Json => render::to_json(&resolved)?,
        Format::Yaml => render::to_yaml(&resolved)?,
    };
    print!("{}", output);
    if matches!(format, Format::Json) {
        println!();
    }
    Ok(())
}
