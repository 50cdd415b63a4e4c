//! CardioRisk: heart disease risk prediction CLI.
//!
//! Main entry point. Prediction output goes to stdout; logs go to stderr or
//! a file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiorisk::adapters::artifacts::ArtifactLoader;
use cardiorisk::adapters::sanitize::SanitizingMakeWriter;
use cardiorisk::config::{AppConfig, LogMode};
use cardiorisk::domain::{Assessment, DISCLAIMER, FEATURE_COUNT};
use cardiorisk::{ModelArtifacts, PatientInput, PatientRecord, PredictionService};

#[derive(Parser)]
#[command(name = "cardiorisk")]
#[command(author, version, about = "Heart disease risk prediction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Artifact bundle directory (overrides CARDIORISK_ARTIFACT_DIR)
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Accept an unsigned bundle (debug builds only)
    #[arg(long, global = true)]
    allow_unsigned: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict heart disease risk for one patient
    Predict {
        /// Patient JSON file, or `-` for stdin (default: form defaults)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Reference stored with the assessment
        #[arg(long)]
        patient_id: Option<String>,
    },

    /// Print the 12-column feature vector fed to the classifier
    Features {
        /// Patient JSON file, or `-` for stdin (default: form defaults)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Summarize the loaded artifact bundle
    Inspect,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.artifacts.clone() {
        config.artifact_dir = dir;
    }
    if cli.allow_unsigned {
        config.allow_unsigned_artifacts = true;
    }

    let _guard = init_logging(&config)?;
    tracing::info!("Starting CardioRisk...");

    match cli.command {
        Commands::Predict {
            input,
            format,
            patient_id,
        } => {
            let service = PredictionService::from_config(&config)?;
            let record = read_record(input.as_deref())?;
            let assessment = service.assess(&record, patient_id.as_deref())?;
            match format {
                OutputFormat::Text => print_assessment(&assessment),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&assessment)?);
                }
            }
        }
        Commands::Features { input, format } => {
            let service = PredictionService::from_config(&config)?;
            let record = read_record(input.as_deref())?;
            let vector = service.build_features(&record)?;
            match format {
                OutputFormat::Text => {
                    for (column, value) in vector.iter() {
                        println!("{:<22}{value:>12.6}", column.name());
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&vector)?),
            }
        }
        Commands::Inspect => inspect(&config)?,
    }

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let (writer, guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("opening log file {:?}", config.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn read_record(input: Option<&Path>) -> Result<PatientRecord> {
    let Some(path) = input else {
        return Ok(PatientRecord::example());
    };

    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading patient JSON from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?
    };

    let input: PatientInput = serde_json::from_str(&text).context("parsing patient JSON")?;
    Ok(PatientRecord::from_input(&input)?)
}

fn print_assessment(assessment: &Assessment) {
    let result = &assessment.result;
    let message = result.risk_band.message();
    if std::io::stdout().is_terminal() {
        let (r, g, b) = result.risk_band.color();
        println!("\x1b[1;38;2;{r};{g};{b}m{message}\x1b[0m");
    } else {
        println!("{message}");
    }
    for line in result.summary_lines() {
        println!("{line}");
    }
    println!();
    println!("Note: {DISCLAIMER}");
}

fn inspect(config: &AppConfig) -> Result<()> {
    let loader = ArtifactLoader::from_config(config)?;
    let bundle = loader
        .load(&config.artifact_dir)
        .with_context(|| format!("loading artifacts from {:?}", config.artifact_dir))?;

    println!("Artifact directory: {}", config.artifact_dir.display());
    match &bundle.manifest {
        Some(m) => println!(
            "Manifest: version {} serial {} created_at {}",
            m.version, m.serial, m.created_at
        ),
        None => println!("Manifest: none (unsigned)"),
    }

    let artifacts = ModelArtifacts::try_from(bundle)?;
    let classifier = artifacts.classifier();
    println!(
        "Classifier: {} over {} features (expected {FEATURE_COUNT})",
        classifier.name(),
        classifier.n_features()
    );
    for (i, name) in classifier.feature_names().iter().enumerate() {
        println!("  [{i:>2}] {name}");
    }

    println!("Scaler:");
    for column in cardiorisk::domain::NumericColumn::ALL {
        println!(
            "  {:<12} mean {:>12.6}  scale {:>12.6}",
            column.name(),
            artifacts.scaler().mean(column),
            artifacts.scaler().scale(column)
        );
    }

    println!("Encoders:");
    for (column, encoder) in artifacts.encoders().columns() {
        println!("  {column:<15} {}", encoder.classes().join(", "));
    }
    Ok(())
}
