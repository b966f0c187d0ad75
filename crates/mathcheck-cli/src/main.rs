//! mathcheck CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mathcheck", version, about = "Answer verification for math study apps")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check answers to one question part
    Check {
        /// Path to the question set .toml
        #[arg(long)]
        question_set: PathBuf,

        /// Question ID
        #[arg(long)]
        question: String,

        /// Part ID
        #[arg(long)]
        part: String,

        /// One answer per slot, in order (repeatable)
        #[arg(long = "input", allow_hyphen_values = true)]
        inputs: Vec<String>,

        /// Print the match result as JSON
        #[arg(long)]
        json: bool,

        /// Exit code 1 if the answer is wrong
        #[arg(long)]
        fail_on_wrong: bool,
    },

    /// Check whether two expressions are equivalent
    Equiv {
        #[arg(allow_hyphen_values = true)]
        a: String,

        #[arg(allow_hyphen_values = true)]
        b: String,

        /// Numeric tolerance override
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Show how an expression is read
    Parse {
        #[arg(allow_hyphen_values = true)]
        expr: String,
    },

    /// Validate question set TOML files
    Validate {
        /// Path to question set file or directory
        #[arg(long)]
        question_set: PathBuf,
    },

    /// Grade a batch of submissions
    Grade {
        /// Path to the question set .toml
        #[arg(long)]
        question_set: PathBuf,

        /// JSON array of submissions
        #[arg(long)]
        submissions: PathBuf,

        /// Max submissions graded at once
        #[arg(long)]
        parallelism: Option<usize>,

        /// Overall batch timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create starter config and example question set
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mathcheck=info,mathcheck_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Check {
            question_set,
            question,
            part,
            inputs,
            json,
            fail_on_wrong,
        } => commands::check::execute(
            config,
            question_set,
            question,
            part,
            inputs,
            json,
            fail_on_wrong,
        ),
        Commands::Equiv { a, b, tolerance } => commands::equiv::execute(config, a, b, tolerance),
        Commands::Parse { expr } => commands::parse::execute(config, expr),
        Commands::Validate { question_set } => commands::validate::execute(config, question_set),
        Commands::Grade {
            question_set,
            submissions,
            parallelism,
            timeout_ms,
            output,
        } => {
            commands::grade::execute(
                config,
                question_set,
                submissions,
                parallelism,
                timeout_ms,
                output,
            )
            .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
