//! ctf-guard CLI
//!
//! Audit a CTF game spec, search for a balance patch, write the evidence bundle.
//! `verify` re-checks a bundle against its manifest.

#[cfg(feature = "cli")]
use anyhow::{bail, Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
const API_KEY_ENV: &str = "GEMINI_API_KEY";
#[cfg(feature = "cli")]
const MODEL_ENV: &str = "GEMINI_MODEL";

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "ctf-guard")]
#[command(about = "Balance audit and auto-patch gate for grid CTF maps", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug-level logs (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Audit a spec, patch it if the gate fails, write artifacts
    Run {
        /// GameSpec JSON file (default: built-in biased map)
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Seed list JSON file; overrides --seed/--seed-count
        #[arg(long)]
        seeds: Option<PathBuf>,

        /// First seed of the expanded seed list
        #[arg(long, default_value_t = cg_core::pipeline::DEFAULT_SEED_BASE)]
        seed: u64,

        /// Number of expanded seeds
        #[arg(long, default_value_t = cg_core::pipeline::DEFAULT_SEED_COUNT)]
        seed_count: usize,

        /// Patch candidates to evaluate before giving up
        #[arg(long, default_value_t = cg_core::regression::DEFAULT_MAX_ATTEMPTS)]
        max_attempts: usize,

        /// Comma-separated roster (e.g. "greedy,camper")
        #[arg(long, value_delimiter = ',')]
        policies: Option<Vec<String>>,

        /// Exploit-dominance ceiling
        #[arg(long, default_value_t = cg_core::gate::DEFAULT_EXPLOIT_THRESHOLD)]
        exploit_threshold: f64,

        /// Use the Gemini oracle (reads GEMINI_API_KEY, GEMINI_MODEL)
        #[arg(long, default_value = "false")]
        use_oracle: bool,

        /// Design prompt for the spec generator (only with --use-oracle and no --spec)
        #[arg(long)]
        prompt: Option<String>,

        /// Output directory for the evidence bundle
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Simulation threads (default: one per core)
        #[arg(long)]
        workers: Option<usize>,

        /// Print result.json to stdout
        #[arg(long, default_value = "false")]
        json: bool,

        /// Exit non-zero when no candidate passes the gate
        #[arg(long, default_value = "false")]
        fail_on_soft_fail: bool,
    },

    /// Verify artifact checksums against manifest.json
    Verify {
        /// Bundle directory
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "cli")]
fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            spec,
            seeds,
            seed,
            seed_count,
            max_attempts,
            policies,
            exploit_threshold,
            use_oracle,
            prompt,
            out,
            workers,
            json,
            fail_on_soft_fail,
        } => {
            let mut config = cg_core::PipelineConfig {
                seed_base: seed,
                seed_count,
                max_attempts,
                workers,
                gate: cg_core::default_gate_spec(exploit_threshold),
                ..Default::default()
            };

            if let Some(path) = &seeds {
                config.seeds = Some(cg_cli::load_seeds(path)?);
            }
            if let Some(names) = &policies {
                config.roster = cg_core::PolicyKind::parse_roster(names)?;
            }

            let oracle = if use_oracle { oracle_config_from_env() } else { None };
            config.spec = match (&spec, &oracle) {
                (Some(path), _) => cg_core::SpecSource::Provided(cg_cli::load_spec(path)?),
                (None, Some(_)) => cg_core::SpecSource::Generated {
                    prompt: prompt.unwrap_or_else(|| cg_core::spec_gen::DEFAULT_PROMPT.to_string()),
                },
                (None, None) => cg_core::SpecSource::Builtin,
            };
            if let Some(oracle) = oracle {
                config.ranking_oracle = Some(Box::new(cg_core::GeminiClient::new(oracle.clone())?));
                config.spec_generator = Some(Box::new(cg_core::GeminiClient::new(oracle)?));
            }

            println!("🔎 Auditing spec...");
            match &spec {
                Some(path) => println!("   Spec:     {}", path.display()),
                None => println!("   Spec:     {}", spec_source_label(&config.spec)),
            }
            println!("   Seeds:    {}", seeds_label(&config));
            println!("   Attempts: {}", config.max_attempts);
            println!("   Output:   {}", out.display());

            let outcome = cg_core::run_pipeline(&config)?;
            print_outcome(&outcome);

            let manifest = cg_cli::write_artifacts(&out, &outcome)?;
            println!("\n📦 Artifacts written to: {}", out.display());
            println!("   Files:    {} (+ {})", manifest.files.len(), cg_cli::MANIFEST_FILE);

            if json {
                let summary = serde_json::to_string_pretty(&outcome.summary())
                    .context("Failed to serialize result")?;
                println!("{}", summary);
            }

            if !outcome.passed && fail_on_soft_fail {
                eprintln!("❌ Gate soft-failed and --fail-on-soft-fail is set");
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Verify { out } => {
            verify_bundle(&out)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Credentials come only from the environment; missing ones disable the oracle.
#[cfg(feature = "cli")]
fn oracle_config_from_env() -> Option<cg_core::OracleConfig> {
    let key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
    let Some(key) = key else {
        tracing::warn!("{} is not set, continuing without oracle", API_KEY_ENV);
        return None;
    };
    let config = cg_core::OracleConfig::new(key);
    Some(match std::env::var(MODEL_ENV) {
        Ok(model) if !model.trim().is_empty() => config.with_model(model),
        _ => config,
    })
}

#[cfg(feature = "cli")]
fn spec_source_label(source: &cg_core::SpecSource) -> &'static str {
    match source {
        cg_core::SpecSource::Provided(_) => "provided",
        cg_core::SpecSource::Generated { .. } => "generated (oracle)",
        cg_core::SpecSource::Builtin => "built-in baseline",
    }
}

#[cfg(feature = "cli")]
fn seeds_label(config: &cg_core::PipelineConfig) -> String {
    match &config.seeds {
        Some(seeds) => format!("{} from file", seeds.len()),
        None => format!("{} from base {}", config.seed_count, config.seed_base),
    }
}

#[cfg(feature = "cli")]
fn print_outcome(outcome: &cg_core::PipelineOutcome) {
    let before = outcome.report_before.metrics;
    let after = outcome.report_after().metrics;

    println!("\n📊 Metrics (before → after)");
    println!("   deadlock_rate:     {:.4} → {:.4}", before.deadlock_rate, after.deadlock_rate);
    println!("   win_rate_A:        {:.4} → {:.4}", before.win_rate_a, after.win_rate_a);
    println!("   win_skew:          {:.4} → {:.4}", before.win_skew, after.win_skew);
    println!("   exploit_dominance: {:.4} → {:.4}", before.exploit_dominance, after.exploit_dominance);
    println!(
        "   reproducible:      {} → {}",
        outcome.report_before.reproducible,
        outcome.report_after().reproducible
    );

    if outcome.short_circuit() {
        println!("\n✅ Spec already passes the gate, no patch needed");
        return;
    }

    println!("\n🩹 Selected patch: {}", outcome.selected_patch().rationale);
    println!("   Operations: {}", outcome.selected_patch().patch_ops.len());
    println!("   Attempts:   {}", outcome.attempts().len());

    if outcome.passed {
        println!("\n✅ Gate passed");
    } else {
        println!("\n⚠️  Gate soft-failed");
        for (key, reason) in &outcome.gate_reasons {
            println!("   {}: {}", key, reason);
        }
    }
}

#[cfg(feature = "cli")]
fn verify_bundle(out: &Path) -> Result<()> {
    println!("🔍 Verifying bundle: {}", out.display());
    let report = cg_cli::verify_artifacts(out)?;

    for name in &report.missing {
        println!("   missing:    {}", name);
    }
    for name in &report.mismatched {
        println!("   mismatched: {}", name);
    }

    if report.is_ok() {
        println!("✅ {} artifacts verified", report.checked);
        Ok(())
    } else {
        bail!(
            "❌ Bundle verification failed - {} missing, {} mismatched",
            report.missing.len(),
            report.mismatched.len()
        )
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("ctf-guard CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
