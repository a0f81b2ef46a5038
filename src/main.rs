use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lodx::{Document, Exporter, ExporterConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lodx", version, about = "Export document annotations as linked data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Export documents to RDF through the mapping rules.
    Export {
        #[command(flatten)]
        settings: Settings,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        corpus: Option<String>,
        #[arg(long)]
        pipeline: Option<String>,
        #[arg(long)]
        input_set: Option<String>,
        #[arg(long)]
        custom_uri: bool,
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Print the compiled mapping rules.
    Rules {
        #[command(flatten)]
        settings: Settings,
        /// Print the rule indexes as JSON instead of one rule per line.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct Settings {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, conflicts_with = "store_dir")]
    mapping_file: Option<PathBuf>,
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

impl Settings {
    fn load(self) -> Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::load_from_path(path)?,
            None => ExporterConfig::default(),
        };
        if let Some(path) = self.mapping_file {
            config.store_dir = None;
            config = config.with_mapping_file(path);
        }
        if let Some(dir) = self.store_dir {
            config.mapping_file = None;
            config = config.with_store_dir(dir);
        }
        Ok(config)
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_document(path: &Path) -> Result<Document> {
    let data = fs::read_to_string(path).with_context(|| format!("cannot read document {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("invalid document JSON in {:?}", path))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Export {
            settings,
            output_dir,
            corpus,
            pipeline,
            input_set,
            custom_uri,
            documents,
        } => {
            let mut config = settings.load()?;
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            if let Some(name) = corpus {
                config = config.with_corpus_name(name);
            }
            if let Some(name) = pipeline {
                config = config.with_pipeline_name(name);
            }
            if let Some(name) = input_set {
                config = config.with_input_set(name);
            }
            if custom_uri {
                config = config.with_custom_uri(true);
            }
            let exporter = Exporter::from_config(&config).context("invalid exporter configuration")?;

            let mut failed = 0;
            for path in &documents {
                let outcome = load_document(path).and_then(|doc| Ok(exporter.export_document(&doc)?));
                match outcome {
                    Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
                    Err(err) => {
                        error!(file = %path.display(), "document not exported: {err:#}");
                        failed += 1;
                    }
                }
            }
            info!(exported = documents.len() - failed, failed, "export finished");
            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Rules { settings, json } => {
            let config = settings.load()?;
            let exporter = Exporter::from_config(&config).context("invalid exporter configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(exporter.rules())?);
            } else {
                for mapping in exporter.rules().mappings() {
                    println!("{mapping}");
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
