//! Shapes Config CLI
//!
//! View and manage flattening configuration.

use clap::{Parser, Subcommand};
use schema_shapes::ShapesConfig;

#[derive(Parser)]
#[command(name = "shapes-config")]
#[command(about = "View and manage schema flattening configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: shapes.toml)
        #[arg(short, long, default_value = "shapes.toml")]
        output: String,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = ShapesConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Shapes Configuration\n");
                println!("General:");
                println!("  Base: {:?}", cfg.general.base);
                println!("  Prefix: {:?}", cfg.general.prefix);
                println!("  Embed threshold: {}", cfg.general.embed_threshold);
                println!("  Default max length: {}", cfg.general.default_max_length);
                println!("  Max depth: {}", cfg.general.max_depth);
                println!(
                    "  Synthetic keys: {} ({})",
                    cfg.general.synthetic_keys, cfg.general.synthetic_key_name
                );
                println!("  Order index: {}", cfg.general.order_index_name);

                if !cfg.primary_keys.is_empty() {
                    println!("\nPrimary keys:");
                    for (shape, key) in &cfg.primary_keys {
                        println!("  {} -> {}", shape, key);
                    }
                }

                if !cfg.aliases.is_empty() {
                    println!("\nAliases:");
                    for rule in &cfg.aliases {
                        println!("  {} -> {}", rule.pattern, rule.replacement);
                    }
                }

                if !cfg.ontologies.is_empty() {
                    println!("\nOntologies:");
                    for o in &cfg.ontologies {
                        println!("  {}: {} <{}>", o.prefix, o.name, o.uri);
                    }
                }

                if !cfg.settings.is_empty() {
                    println!("\nSettings:");
                    for (name, setting) in &cfg.settings {
                        println!("  {} = {}", name, setting.value);
                    }
                }
            }
        }

        Commands::Init { output } => {
            let cfg = ShapesConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => {
            let cfg = match ShapesConfig::load_from(config.as_deref()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("❌ Configuration error: {}", e);
                    std::process::exit(1);
                }
            };
            match cfg.flatten_options() {
                Ok(options) => {
                    println!("✅ Configuration is valid");
                    println!("   Base: {}", options.base);
                    println!("   Primary key: {:?}", options.primary_key);
                    println!("   Aliases: {}", cfg.aliases.len());
                }
                Err(e) => {
                    eprintln!("❌ Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
