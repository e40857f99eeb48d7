//! Annotations Config CLI
//!
//! View and manage annotation checking configuration.

use clap::{Parser, Subcommand};
use familiar_annotations::AnnotationConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "annotations-config")]
#[command(about = "View and manage annotation checking configuration")]
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
        /// Output path (default: annotations.toml)
        #[arg(short, long, default_value = "annotations.toml")]
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
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = AnnotationConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Annotation Checking Configuration\n");
                println!("Checking:");
                println!("  Enabled: {}", cfg.checking.enabled);
                println!("  Expressions: {}", cfg.checking.expressions);

                println!("\nDiagnostics:");
                println!("  Mapping trail: {:?}", cfg.diagnostics.mapping_trail);
            }
        }

        Commands::Init { output } => {
            let cfg = AnnotationConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => match AnnotationConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                println!("✅ Configuration is valid");
                println!("   Checking enabled: {}", cfg.checking.enabled);
                println!("   Mapping trail: {:?}", cfg.diagnostics.mapping_trail);
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
