//! halgate - validate, score and promote generated Vehicle-HAL artifacts
//!
//! ## Commands
//!
//! - `tools`: Show which native validators the host provides
//! - `validate`: Run the validator for one artifact
//! - `score`: Validate and blend structural, syntax and coverage scores
//! - `promote`: Gate a draft tree into the output root
//!
//! `validate`, `score` and `promote` print JSON on stdout. The exit code is 0
//! when the artifact or draft is accepted, 1 when it is not, and 2 on errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use halgate_core::{
    entities_from_property_listing, init_tracing, level_for_verbosity, ArtifactType, Evaluator,
    HalgateConfig, ValidatorRegistry, METRICS,
};
use halgate_promote::{PromotionGate, RequiredFileSet, ENV_DRAFT_ROOT};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "halgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile-aware validation and promotion gating for generated Vehicle-HAL artifacts", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: ./halgate.toml when present)
    #[arg(long, global = true, env = "HALGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Per-invocation native tool timeout in seconds (capped at 60)
    #[arg(long, global = true)]
    tool_timeout_secs: Option<u64>,

    /// Artifacts validated in parallel by batch evaluation
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show native tool availability per artifact type
    Tools,

    /// Validate one artifact file
    Validate {
        /// Artifact type tag (aidl, cpp, selinux, build, vintf, puml, ...)
        #[arg(short = 't', long = "type")]
        artifact_type: ArtifactType,

        /// Artifact file, or `-` for stdin
        file: PathBuf,
    },

    /// Validate and score one artifact file
    Score {
        #[arg(short = 't', long = "type")]
        artifact_type: ArtifactType,

        /// Artifact file, or `-` for stdin
        file: PathBuf,

        /// Entity name the artifact is expected to mention (repeatable)
        #[arg(long = "expect", value_name = "NAME")]
        expect: Vec<String>,

        /// Property listing to take expected entity names from
        #[arg(long)]
        properties: Option<PathBuf>,
    },

    /// Promote a draft tree into the output root
    Promote {
        /// Draft tree (default: <output-root>/.llm_draft/latest)
        #[arg(long, env = ENV_DRAFT_ROOT)]
        draft_root: Option<PathBuf>,

        /// Destination tree
        #[arg(long, default_value = ".")]
        output_root: PathBuf,

        /// TOML rule set replacing the built-in Vehicle-HAL rules
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

/// Whether the command accepted its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    fn from_ok(ok: bool) -> Self {
        if ok {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Verdict::Accepted => ExitCode::SUCCESS,
            Verdict::Rejected => ExitCode::from(1),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for_verbosity(cli.verbose));

    let outcome = run(cli).await;
    METRICS.flush();

    match outcome {
        Ok(verdict) => verdict.exit_code(),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<Verdict> {
    let config = load_config(&cli)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Tools => cmd_tools(&config),
        Commands::Validate {
            artifact_type,
            file,
        } => cmd_validate(&config, artifact_type, &file).await,
        Commands::Score {
            artifact_type,
            file,
            expect,
            properties,
        } => cmd_score(&config, artifact_type, &file, expect, properties.as_deref()).await,
        Commands::Promote {
            draft_root,
            output_root,
            rules,
        } => cmd_promote(draft_root, output_root, rules.as_deref()).await,
    }
}

/// File, then environment, then flags.
fn load_config(cli: &Cli) -> Result<HalgateConfig> {
    let mut config =
        HalgateConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(secs) = cli.tool_timeout_secs {
        config.tool_timeout_secs = secs;
    }
    if let Some(n) = cli.max_concurrency {
        config.max_concurrency = Some(n);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_artifact(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut content)
            .context("Failed to read artifact from stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_tools(config: &HalgateConfig) -> Result<Verdict> {
    let registry = ValidatorRegistry::host(config);
    let report = registry.availability_report();

    println!("{:<16} {:<24} {:<10} FALLBACK", "TYPE", "TOOL", "STATUS");
    for row in &report {
        let status = if row.available { "available" } else { "missing" };
        println!(
            "{:<16} {:<24} {:<10} {}",
            row.artifact_type.tag(),
            row.tool,
            status,
            row.fallback.as_deref().unwrap_or("-")
        );
    }
    let native = report.iter().filter(|r| r.fallback.is_some()).count();
    let available = report
        .iter()
        .filter(|r| r.fallback.is_some() && r.available)
        .count();
    println!();
    println!("{available}/{native} native validators available");
    Ok(Verdict::Accepted)
}

async fn cmd_validate(
    config: &HalgateConfig,
    artifact_type: ArtifactType,
    file: &Path,
) -> Result<Verdict> {
    let content = read_artifact(file)?;
    let registry = ValidatorRegistry::host(config);
    let result = registry.validate(artifact_type, &content).await;

    info!(
        artifact_type = %artifact_type,
        tool = %result.tool,
        ok = result.ok,
        score = result.score,
        "validation finished"
    );
    print_json(&result)?;
    Ok(Verdict::from_ok(result.ok))
}

#[derive(Debug, Serialize)]
struct ScoreOutput<'a> {
    #[serde(flatten)]
    evaluation: &'a halgate_core::ArtifactEvaluation,
    threshold: f64,
    accepted: bool,
}

/// `--expect` names plus whatever the property listing yields.
fn expected_entities(
    expect: Vec<String>,
    properties: Option<&Path>,
) -> Result<Option<Vec<String>>> {
    let mut names = expect;
    if let Some(path) = properties {
        let listing = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read property listing {}", path.display()))?;
        names.extend(entities_from_property_listing(&listing));
    }
    let mut seen = std::collections::HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
    Ok(if names.is_empty() { None } else { Some(names) })
}

async fn cmd_score(
    config: &HalgateConfig,
    artifact_type: ArtifactType,
    file: &Path,
    expect: Vec<String>,
    properties: Option<&Path>,
) -> Result<Verdict> {
    let content = read_artifact(file)?;
    let expected = expected_entities(expect, properties)?;

    let evaluator = Evaluator::from_config(config);
    let evaluation = evaluator
        .evaluate(artifact_type, &content, expected.as_deref())
        .await;

    let threshold = config.thresholds.for_type(artifact_type);
    let accepted = evaluation.breakdown.blended >= threshold;
    info!(
        artifact_type = %artifact_type,
        blended = evaluation.breakdown.blended,
        threshold,
        accepted,
        "artifact scored"
    );
    print_json(&ScoreOutput {
        evaluation: &evaluation,
        threshold,
        accepted,
    })?;
    Ok(Verdict::from_ok(accepted))
}

async fn cmd_promote(
    draft_root: Option<PathBuf>,
    output_root: PathBuf,
    rules: Option<&Path>,
) -> Result<Verdict> {
    let mut gate = PromotionGate::from_env(output_root);
    if let Some(root) = draft_root {
        gate = gate.with_draft_root(root);
    }
    if let Some(path) = rules {
        let rules = RequiredFileSet::load(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
        gate = gate.with_rules(rules);
    }

    let report = tokio::task::spawn_blocking(move || gate.run())
        .await
        .context("Promotion task failed")?
        .context("Failed to write promotion report")?;

    print_json(&report)?;
    Ok(Verdict::from_ok(report.ok))
}
