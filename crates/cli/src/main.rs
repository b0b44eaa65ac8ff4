mod definition;
mod report;

use anyhow::{Context, Result};
use argbind::{App, ArgError, ParseOutcome};
use argbind_metadata::DefinitionV1;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

use crate::definition::{DEFAULT_DEFINITION_NAME, load_definition, read_env_file};

#[derive(Parser)]
#[command(name = "argbind")]
#[command(version, about = "Parse command lines against JSON option definitions", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example argbind.json definition
    Init(InitArgs),

    /// Print the help text a definition renders
    Help(HelpArgs),

    /// Parse tokens against a definition and print the typed results as JSON
    Parse(ParseArgs),

    /// Print the normalized definition
    Schema(SchemaArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Overwrite an existing definition
    #[arg(short, long)]
    force: bool,
}

#[derive(Parser)]
struct HelpArgs {
    /// Path to the definition file
    #[arg(short, long, default_value = DEFAULT_DEFINITION_NAME, value_name = "FILE")]
    spec: PathBuf,

    /// Subcommand path to render help for
    #[arg(value_name = "SUBCOMMAND")]
    path: Vec<String>,
}

#[derive(Parser)]
struct ParseArgs {
    /// Path to the definition file
    #[arg(short, long, default_value = DEFAULT_DEFINITION_NAME, value_name = "FILE")]
    spec: PathBuf,

    /// Read option values from the process environment
    #[arg(long)]
    env: bool,

    /// Read option values from a dotenv file (process variables win with --env)
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Tokens to parse, after `--`
    #[arg(last = true, value_name = "TOKENS")]
    tokens: Vec<String>,
}

#[derive(Parser)]
struct SchemaArgs {
    /// Path to the definition file
    #[arg(short, long, default_value = DEFAULT_DEFINITION_NAME, value_name = "FILE")]
    spec: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Help(args) => help_command(args),
        Commands::Parse(args) => parse_command(args),
        Commands::Schema(args) => schema_command(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = definition::write_default_definition(&dir, args.force)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_DEFINITION_NAME} to describe your command line");
    eprintln!("  2. Run: argbind help");
    eprintln!("  3. Run: argbind parse -- <TOKENS>");

    Ok(())
}

fn load_app(spec: &Path) -> Result<App> {
    let definition = load_definition(spec)?;
    App::from_schema(&definition.app)
        .with_context(|| format!("invalid definition: {}", spec.display()))
}

fn help_command(args: HelpArgs) -> Result<()> {
    tracing::debug!("executing help command");

    let app = load_app(&args.spec)?;
    let mut target = &app;
    for name in &args.path {
        target = target
            .subcommand(name)
            .with_context(|| format!("unknown subcommand `{name}` in {}", target.name()))?;
    }
    print!("{}", target.help());
    Ok(())
}

fn parse_command(args: ParseArgs) -> Result<()> {
    tracing::debug!("executing parse command");

    let mut app = load_app(&args.spec)?;

    // First match wins, so process variables go in front of the file.
    let mut env: Vec<(String, String)> = Vec::new();
    if args.env {
        env.extend(process_env());
    }
    if let Some(path) = &args.env_file {
        env.extend(read_env_file(path)?);
    }

    match app.run_with_env(args.tokens, &env) {
        Ok(ParseOutcome::Help(text)) | Ok(ParseOutcome::Version(text)) => {
            print!("{text}");
        }
        Ok(ParseOutcome::Parsed) => {
            let report = report::build_report(&app).unwrap_or_else(|err| exit_with(&err));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Err(err) => exit_with(&err),
    }
    Ok(())
}

/// Process variables whose name and value are both UTF-8; the rest can never match an option.
fn process_env() -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                tracing::debug!(?key, "skipping non UTF-8 environment variable");
                None
            }
        })
        .collect()
}

fn schema_command(args: SchemaArgs) -> Result<()> {
    tracing::debug!("executing schema command");

    let app = load_app(&args.spec)?;
    let json = DefinitionV1::new(app.to_schema())
        .to_json_pretty()
        .context("failed to serialize definition")?;
    println!("{json}");
    Ok(())
}

fn exit_with(err: &ArgError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(err.exit_code());
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
