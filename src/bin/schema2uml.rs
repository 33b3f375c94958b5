use clap::Parser;
use schema_shapes::{flatten_file, render_plantuml, ShapesConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema2uml")]
#[command(about = "Render a JSON Schema's shapes as a PlantUML class diagram")]
struct Cli {
    /// JSON schema
    schema: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Root shape name (overrides general.base)
    #[arg(short, long)]
    base: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ShapesConfig::load_from(cli.config.as_deref())?;
    if let Some(base) = cli.base {
        config.general.base = Some(base);
    }

    let options = config.flatten_options()?;
    let model = flatten_file(&cli.schema, &options)?;
    let uml = render_plantuml(&model);

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &uml)?;
            eprintln!("✅ Exported PlantUML to: {:?}", path);
        }
        None => print!("{}", uml),
    }

    Ok(())
}
