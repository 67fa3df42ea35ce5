//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use bench::{domain_breakdown, BenchmarkEvaluator, Dataset, ReportWriter};
use hybrid::{agreement, claim_score, ChainJudge, HybridEngine};
use providers::{EvaluationOptions, ProviderChain, ProviderResponse, Usage};
use symbolic::{SymbolicPool, SymbolicVerifier};

use crate::config::{build_pool_config, load_config, ProofcoreToml};
use crate::results::{JudgeOutput, ProofDocument, VerifyOutput};

/// Arguments for the `bench` subcommand.
#[derive(Debug)]
pub struct BenchArgs {
    pub config: Option<PathBuf>,
    /// Dataset JSON array.
    pub dataset: PathBuf,
    pub output_dir: PathBuf,
    /// Report file stem.
    pub name: String,
}

/// Arguments for the `verify` subcommand.
#[derive(Debug)]
pub struct VerifyArgs {
    pub config: Option<PathBuf>,
    pub proof: PathBuf,
    pub num_workers: Option<usize>,
    /// Fold a provider-chain score into every step.
    pub judge: bool,
    /// Query every provider instead of the first that answers.
    pub judge_all: bool,
}

/// Arguments for the `check` and `simplify` subcommands.
#[derive(Debug)]
pub struct SymbolicArgs {
    pub config: Option<PathBuf>,
    pub num_workers: Option<usize>,
}

/// Arguments for the `judge` subcommand.
#[derive(Debug)]
pub struct JudgeArgs {
    pub config: Option<PathBuf>,
    pub claim: String,
    pub reasoning: String,
    /// Ask every available provider and report their agreement.
    pub all: bool,
    /// Score with the local claim heuristic, no network.
    pub offline: bool,
}

async fn start_verifier(
    toml: &ProofcoreToml,
    num_workers: Option<usize>,
) -> anyhow::Result<SymbolicVerifier> {
    let pool_config = build_pool_config(&toml.symbolic_pool, num_workers);
    tracing::info!(
        num_workers = pool_config.num_workers,
        "Starting symbolic worker pool"
    );
    let pool = SymbolicPool::new(pool_config).await?;
    Ok(SymbolicVerifier::new(Arc::new(pool)))
}

/// Score a dataset and write `<name>.json` and `<name>.csv`.
pub fn run_bench(args: BenchArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let toml = load_config(args.config.as_deref())?;
    let evaluator = BenchmarkEvaluator::new(toml.benchmark)?;

    let dataset = Dataset::load(&args.dataset)?;

    let pb = ProgressBar::new(dataset.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    let mut scores = Vec::with_capacity(dataset.len());
    for item in &dataset.items {
        pb.set_message(item.id.clone());
        scores.push(evaluator.evaluate_item(item));
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let report = evaluator.summarize(scores);
    let paths = ReportWriter::new(args.output_dir, args.name).write(&report)?;

    let meta = &report.meta;
    println!("\n--- Benchmark Results ---");
    println!("Total proofs: {}", meta.n);
    if dataset.malformed > 0 {
        println!("Malformed items (scored as placeholders): {}", dataset.malformed);
    }
    println!("Passed: {}/{}", meta.passed, meta.n);
    println!("Accuracy: {:.1}%", meta.accuracy * 100.0);
    println!("Accuracy CI95-low: {:.1}%", meta.accuracy_ci95_low * 100.0);
    println!("Average scores:");
    println!("  Symbolic: {:.1}", meta.avg_symbolic);
    println!("  Semantic: {:.1} (offline placeholder)", meta.avg_semantic);
    println!("  Hybrid: {:.1}", meta.avg_hybrid);
    let breakdown = domain_breakdown(&report.items);
    if !breakdown.is_empty() {
        println!("By domain:");
        for (domain, stats) in &breakdown {
            println!(
                "  {domain}: {}/{} ({:.1}%)",
                stats.passed,
                stats.n,
                stats.pass_rate * 100.0
            );
        }
    }
    println!("JSON: {}", paths.json.display());
    println!("CSV: {}", paths.csv.display());
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Verify every step of a proof document and print the verdict as JSON.
pub async fn run_verify(args: VerifyArgs) -> anyhow::Result<()> {
    let toml = load_config(args.config.as_deref())?;
    let doc = ProofDocument::load(&args.proof)?;
    tracing::info!(name = %doc.name, steps = doc.steps.len(), "Loaded proof");

    let verifier = start_verifier(&toml, args.num_workers).await?;
    let mut engine = HybridEngine::new(toml.verification, Arc::new(verifier.clone()))?;

    let chain = if args.judge {
        let chain = Arc::new(ProviderChain::from_config(&toml.providers)?);
        let judge = if args.judge_all {
            ChainJudge::across_providers(Arc::clone(&chain), EvaluationOptions::default())
        } else {
            ChainJudge::new(Arc::clone(&chain), EvaluationOptions::default())
        };
        engine = engine.with_judge(Arc::new(judge));
        Some(chain)
    } else {
        None
    };

    let result = engine.verify_proof(&doc.steps).await;
    verifier.shutdown().await;
    let verdict = result?;

    let output = VerifyOutput {
        name: doc.name,
        verdict,
        metrics: engine.metrics(),
        costs: chain.map(|c| c.ledger_stats()).unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print `true` iff `lhs` and `rhs` are symbolically equivalent.
pub async fn run_check(args: SymbolicArgs, lhs: &str, rhs: &str) -> anyhow::Result<()> {
    let toml = load_config(args.config.as_deref())?;
    let verifier = start_verifier(&toml, args.num_workers).await?;
    let verdict = verifier.check_equation(lhs, rhs).await;
    verifier.shutdown().await;

    tracing::debug!(?verdict, "Equivalence check finished");
    println!("{}", verdict.is_equivalent());
    Ok(())
}

/// Print the canonical form of `expr`. Fails when it cannot be simplified.
pub async fn run_simplify(args: SymbolicArgs, expr: &str) -> anyhow::Result<()> {
    let toml = load_config(args.config.as_deref())?;
    let verifier = start_verifier(&toml, args.num_workers).await?;
    let simplified = verifier.simplify_expression(expr).await;
    verifier.shutdown().await;

    match simplified {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => anyhow::bail!("could not simplify {expr:?}"),
    }
}

/// Score a claim with the provider chain (or offline) and print the
/// normalized responses, their agreement and the cost ledgers.
pub async fn run_judge(args: JudgeArgs) -> anyhow::Result<()> {
    let toml = load_config(args.config.as_deref())?;

    let output = if args.offline {
        let response = ProviderResponse {
            provider: "offline".to_string(),
            model: "claim-heuristic".to_string(),
            score: claim_score(&args.claim),
            reasoning: "offline heuristic".to_string(),
            raw_response: String::new(),
            usage: Usage::default(),
            cost: 0.0,
            duration_ms: 0,
        };
        JudgeOutput {
            agreement: agreement(&[f64::from(response.score)]),
            responses: vec![response],
            costs: Vec::new(),
            total_cost: 0.0,
            providers: Vec::new(),
        }
    } else {
        let chain = ProviderChain::from_config(&toml.providers)?;
        let options = EvaluationOptions::default();
        let responses = if args.all {
            chain.evaluate_all(&args.claim, &args.reasoning, &options).await?
        } else {
            vec![chain.evaluate(&args.claim, &args.reasoning, &options).await?]
        };
        let scores: Vec<f64> = responses.iter().map(|r| f64::from(r.score)).collect();
        JudgeOutput {
            agreement: agreement(&scores),
            responses,
            costs: chain.ledger_stats(),
            total_cost: chain.total_cost(),
            providers: chain.health(),
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
