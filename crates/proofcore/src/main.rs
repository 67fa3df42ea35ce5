mod config;
mod pipeline;
mod results;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pipeline::{BenchArgs, JudgeArgs, SymbolicArgs, VerifyArgs};

/// proofcore: hybrid symbolic and heuristic scoring of mathematical proofs.
#[derive(Parser)]
#[command(name = "proofcore", version, about)]
struct Cli {
    /// Path to the TOML config. Defaults to configs/proofcore.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for benchmarking, verification and judging.
#[derive(Subcommand)]
enum Command {
    /// Score a proof dataset and write JSON and CSV reports.
    Bench {
        /// Path to the dataset JSON array.
        #[arg(long)]
        dataset: PathBuf,
        /// Directory for the report files.
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
        /// Report file stem.
        #[arg(long, default_value = "bench_v0_1")]
        name: String,
    },
    /// Verify each step of a proof document and print the verdict as JSON.
    Verify {
        /// Path to a proof JSON file `{name, steps: [...]}`.
        #[arg(long)]
        proof: PathBuf,
        /// Override the number of symbolic workers.
        #[arg(long)]
        num_workers: Option<usize>,
        /// Also score each step with the language-model provider chain.
        #[arg(long)]
        judge: bool,
        /// With --judge, ask every provider and gate steps on their agreement.
        #[arg(long, requires = "judge")]
        judge_all: bool,
    },
    /// Check whether two expressions are symbolically equivalent.
    Check {
        #[arg(long, allow_hyphen_values = true)]
        lhs: String,
        #[arg(long, allow_hyphen_values = true)]
        rhs: String,
        /// Override the number of symbolic workers.
        #[arg(long)]
        num_workers: Option<usize>,
    },
    /// Print the canonical simplified form of an expression.
    Simplify {
        #[arg(long, allow_hyphen_values = true)]
        expr: String,
        /// Override the number of symbolic workers.
        #[arg(long)]
        num_workers: Option<usize>,
    },
    /// Score a claim with the provider chain and report cost.
    Judge {
        #[arg(long)]
        claim: String,
        #[arg(long, default_value = "")]
        reasoning: String,
        /// Query every available provider and report their agreement.
        #[arg(long)]
        all: bool,
        /// Use the local claim heuristic instead of any provider.
        #[arg(long, conflicts_with = "all")]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    match cli.command {
        Command::Bench {
            dataset,
            output_dir,
            name,
        } => pipeline::run_bench(BenchArgs {
            config,
            dataset,
            output_dir,
            name,
        }),
        Command::Verify {
            proof,
            num_workers,
            judge,
            judge_all,
        } => {
            pipeline::run_verify(VerifyArgs {
                config,
                proof,
                num_workers,
                judge,
                judge_all,
            })
            .await
        }
        Command::Check {
            lhs,
            rhs,
            num_workers,
        } => pipeline::run_check(SymbolicArgs { config, num_workers }, &lhs, &rhs).await,
        Command::Simplify { expr, num_workers } => {
            pipeline::run_simplify(SymbolicArgs { config, num_workers }, &expr).await
        }
        Command::Judge {
            claim,
            reasoning,
            all,
            offline,
        } => {
            pipeline::run_judge(JudgeArgs {
                config,
                claim,
                reasoning,
                all,
                offline,
            })
            .await
        }
    }
}
