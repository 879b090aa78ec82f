use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use loan_risk_engine::{
    load_config, EngineConfig, EngineError, LoanFeatures, LoanPredictor, SimulatedBackend,
};

#[derive(Parser)]
#[command(name = "loan-risk")]
#[command(version = "0.1.0")]
#[command(about = "Score loan applications for fraud, risk, affordability and default", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./loan-risk.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single loan application
    Score {
        #[arg(long)]
        loan_amount: f64,
        /// Annual income
        #[arg(long)]
        income: f64,
        #[arg(long)]
        credit_score: u32,
        /// Existing debt-to-income ratio (0-1)
        #[arg(long)]
        debt_to_income: f64,
        #[arg(long)]
        employment_years: f64,
        /// Loan term in months
        #[arg(long)]
        loan_term: u32,
    },
    /// Score every application in a JSON array file
    Batch {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Warm up the configured models and list what is resident
    Models,
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Score {
            loan_amount,
            income,
            credit_score,
            debt_to_income,
            employment_years,
            loan_term,
        } => {
            let features = LoanFeatures {
                loan_amount,
                income,
                credit_score,
                debt_to_income,
                employment_years,
                loan_term,
            };
            score(&config, features).await?;
        }
        Commands::Batch { input } => {
            score_batch(&config, &input).await?;
        }
        Commands::Models => {
            show_models(&config).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Wire the predictor and start warming up the configured models. Callers
/// may drop the handle; predictions join any load still in flight.
fn build_predictor(config: &EngineConfig) -> (LoanPredictor, JoinHandle<()>) {
    let backend = Arc::new(SimulatedBackend::new(config.models.mock_load_delay()));
    let predictor = LoanPredictor::from_config(config, backend);
    let warm_up = predictor.warm_up(&config.models.warm_up);
    (predictor, warm_up)
}

async fn score(config: &EngineConfig, features: LoanFeatures) -> Result<()> {
    features.validate().map_err(EngineError::InvalidInput)?;

    let (predictor, _warm_up) = build_predictor(config);
    let result = predictor.predict(&features).await?;
    info!(
        "Recommendation: {} (risk {:.3}, fraud {:.2}, default {:.2}, confidence {:.2})",
        result.recommendation,
        result.risk_score,
        result.fraud_score,
        result.default_probability,
        result.confidence
    );
    if result.needs_review() {
        info!("Application needs manual review");
    } else if !result.is_approved() {
        warn!("Application rejected");
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    predictor.shutdown().await;
    Ok(())
}

async fn score_batch(config: &EngineConfig, input: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let applications: Vec<LoanFeatures> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    info!("Scoring {} applications from {}", applications.len(), input.display());

    // Invalid rows are reported in place and never reach the engine
    let mut outputs: Vec<Option<serde_json::Value>> = vec![None; applications.len()];
    let mut valid = Vec::new();
    let mut valid_idx = Vec::new();
    for (idx, features) in applications.iter().enumerate() {
        match features.validate() {
            Ok(()) => {
                valid.push(*features);
                valid_idx.push(idx);
            }
            Err(errors) => {
                warn!("Application {} rejected: {}", idx, errors.join(", "));
                outputs[idx] = Some(json!({ "error": EngineError::InvalidInput(errors).to_string() }));
            }
        }
    }

    let (predictor, _warm_up) = build_predictor(config);
    let results = predictor.predict_batch(&valid).await;
    let mut approved = 0;
    let mut review = 0;
    for (idx, result) in valid_idx.into_iter().zip(results) {
        outputs[idx] = Some(match result {
            Ok(prediction) => {
                if prediction.is_approved() {
                    approved += 1;
                } else if prediction.needs_review() {
                    review += 1;
                }
                json!({ "ok": prediction })
            }
            Err(e) => json!({ "error": e.to_string() }),
        });
    }

    let outputs: Vec<serde_json::Value> = outputs.into_iter().flatten().collect();
    println!("{}", serde_json::to_string_pretty(&outputs)?);

    info!("{} approved, {} for review", approved, review);
    let stats = predictor.cache().stats().await;
    info!("Cache: {} entries, {} hits, {} misses", stats.size, stats.hits, stats.misses);
    predictor.shutdown().await;
    Ok(())
}

async fn show_models(config: &EngineConfig) -> Result<()> {
    let (predictor, warm_up) = build_predictor(config);
    warm_up.await?;

    let models = predictor.loader().resident_models().await;
    println!("{}", serde_json::to_string_pretty(&models)?);
    predictor.shutdown().await;
    Ok(())
}
