//! Command-line argument corpus generator.
//!
//! Reads a JSON description of a tool's command line and writes seeded,
//! rule-respecting (and optionally corrupted) argument lines for fuzzing.

use std::path::{Path, PathBuf};

use anyhow::Result;
use argsfuzz::core::registry::GeneratorRegistry;
use argsfuzz::exit_codes;
use argsfuzz::fuzz::run_generate;
use argsfuzz::io::corpus::OutputFormat;
use argsfuzz::io::document_store::{EMBEDDED_SCHEMA, load_model};
use argsfuzz::io::settings::{SettingsOverrides, load_settings};
use argsfuzz::logging;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "argsfuzz",
    version,
    about = "Generate command-line argument corpora for fuzzing"
)]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a corpus from a configuration document.
    Generate {
        /// Configuration document (JSON).
        config: PathBuf,
        /// JSON schema to check the document against instead of the embedded one.
        #[arg(short, long)]
        schema: Option<PathBuf>,
        /// Settings file (TOML).
        #[arg(short = 'c', long)]
        settings: Option<PathBuf>,
        /// Number of samples.
        #[arg(short = 'n', long)]
        num_generations: Option<usize>,
        #[arg(long)]
        min_args: Option<usize>,
        #[arg(long)]
        max_args: Option<usize>,
        /// Fraction of samples to corrupt, within [0, 1].
        #[arg(long)]
        invalid_ratio: Option<f64>,
        #[arg(short = 'f', long, value_enum)]
        output_format: Option<OutputFormat>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        /// Create dummy files and directories on disk for path values.
        #[arg(long)]
        create_dummy_files: bool,
    },
    /// Check a configuration document and print what it defines.
    Validate {
        config: PathBuf,
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
    /// List registered value generators.
    Generators,
    /// Print the embedded configuration schema.
    Schema,
}

fn main() {
    match run() {
        Ok(code) => {
            if code != exit_codes::OK {
                std::process::exit(code);
            }
        }
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match cli.command {
        Command::Generate {
            config,
            schema,
            settings,
            num_generations,
            min_args,
            max_args,
            invalid_ratio,
            output_format,
            output,
            seed,
            create_dummy_files,
        } => {
            let overrides = SettingsOverrides {
                num_generations,
                invalid_ratio,
                output_format,
                output_path: output,
                seed,
                min_args,
                max_args,
                create_dummy_files,
            };
            cmd_generate(&config, schema.as_deref(), settings.as_deref(), &overrides)
        }
        Command::Validate { config, schema } => cmd_validate(&config, schema.as_deref()),
        Command::Generators => cmd_generators(),
        Command::Schema => {
            print!("{EMBEDDED_SCHEMA}");
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_generate(
    config: &Path,
    schema: Option<&Path>,
    settings_path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<i32> {
    let mut settings = load_settings(settings_path)?;
    settings.apply(overrides);
    settings.validate()?;

    let registry = GeneratorRegistry::with_builtins();
    let summary = run_generate(config, schema, &settings, &registry)?;
    println!("{}", summary.line());
    if summary.total == 0 {
        return Ok(exit_codes::EMPTY);
    }
    Ok(exit_codes::OK)
}

fn cmd_validate(config: &Path, schema: Option<&Path>) -> Result<i32> {
    let model = load_model(config, schema)?;
    println!(
        "{}: {} arguments, {} subcommands, {} rules",
        model.tool_name,
        model.argument_count(),
        model.subcommands.len(),
        model.rule_count()
    );
    for rule_type in &model.unknown_rule_types {
        println!("unenforced rule type: {rule_type}");
    }
    Ok(exit_codes::OK)
}

fn cmd_generators() -> Result<i32> {
    for name in GeneratorRegistry::with_builtins().names() {
        println!("{name}");
    }
    Ok(exit_codes::OK)
}
