//! Schema to Shapes CLI
//!
//! Flattens a JSON Schema into shape definition sheets.

use clap::Parser;
use schema_shapes::{check_model, flatten_file, Checksum, SheetFormat, ShapesConfig, Workbook};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "json2shapes")]
#[command(about = "Flatten a JSON Schema into relational shape definitions")]
struct Cli {
    /// Base JSON schema
    schema: PathBuf,

    /// Output directory (csv) or file (json)
    output: PathBuf,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: SheetFormat,

    /// Root shape name (overrides general.base)
    #[arg(short, long)]
    base: Option<String>,

    /// Identifier prefix (overrides general.prefix)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Check model invariants before writing
    #[arg(long)]
    check: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ShapesConfig::load_from(cli.config.as_deref())?;
    if let Some(base) = cli.base {
        config.general.base = Some(base);
    }
    if let Some(prefix) = cli.prefix {
        config.general.prefix = Some(prefix);
    }

    let options = config.flatten_options()?;
    let model = flatten_file(&cli.schema, &options)?;

    if cli.check {
        let report = check_model(&model, &options);
        for warning in &report.warnings {
            println!("⚠️  {}", warning);
        }
        if !report.is_clean() {
            for error in &report.errors {
                eprintln!("❌ {}", error);
            }
            return Err(format!("{} check error(s)", report.errors.len()).into());
        }
    }

    let workbook = Workbook::build(&model, &config)?;
    let files = workbook.write(&cli.output, cli.format)?;

    println!("Shapes: {}", workbook.shapes.len());
    println!("Properties: {}", model.len());
    println!("Checksum: {}", Checksum::from_model(&model)?);
    for file in files {
        println!("✅ Wrote {:?}", file);
    }

    Ok(())
}
