use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use placement_core::config;
use placement_core::feedback::{parse_as, SpeakingFeedback, WritingFeedback};
use placement_core::present;
use placement_core::prompt::GenerateRequest;
use placement_core::questions::{self, QUESTION_BANK};
use placement_core::session::check_writing_sample;
use placement_core::store::read_records;
use placement_core::{extract, ExpectedShape};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Exit code when the input holds no usable JSON.
const EXIT_EXTRACT_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "placement", version, about = "Placement test tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pull the JSON value out of raw model output.
    Extract {
        /// File with the model output (stdin when omitted).
        file: Option<PathBuf>,
        #[arg(long, default_value = "either")]
        expect: ExpectedShape,
    },
    /// Draw multiple-choice questions from the bank.
    Questions {
        #[arg(long, default_value_t = questions::DEFAULT_DRAW)]
        count: usize,
        /// Seed for a reproducible draw.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the `/analyse` body the page sends for a scoring request.
    Request {
        #[arg(value_enum)]
        kind: RequestKind,
        /// Writing sample or speech transcript; question count for `questions`.
        text: String,
    },
    /// Render model feedback as text.
    Render {
        #[arg(value_enum)]
        kind: RenderKind,
        /// File with the model output (stdin when omitted).
        file: Option<PathBuf>,
    },
    /// Print saved results from a JSON-lines store.
    Results {
        /// Store file (defaults to the configured store path).
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the effective configuration.
    Config {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RequestKind {
    Writing,
    Speaking,
    Questions,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RenderKind {
    Writing,
    Speaking,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Extract { file, expect } => {
            let input = read_input(file.as_deref())?;
            let (out, ok) = extract_report(&input, expect);
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_EXTRACT_FAILED)
            })
        }
        Command::Questions { count, seed } => {
            questions::validate(&QUESTION_BANK)?;
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            let drawn = questions::draw(count, &mut rng);
            println!("{}", serde_json::to_string_pretty(&drawn)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Request { kind, text } => {
            let body = build_request(kind, &text)?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Render { kind, file } => {
            let input = read_input(file.as_deref())?;
            match render_feedback(kind, &input) {
                Ok(text) => {
                    print!("{text}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(message) => {
                    println!("{}", present::render_failure(&message));
                    Ok(ExitCode::from(EXIT_EXTRACT_FAILED))
                }
            }
        }
        Command::Results { store, root } => {
            let path = match store {
                Some(p) => p,
                None => config::load_or_default(&root)
                    .map_err(anyhow::Error::msg)?
                    .store
                    .resolve(&root)
                    .context("no --store given and no [store] path configured")?,
            };
            let runtime = tokio_runtime()?;
            let records = runtime.block_on(read_records(&path))?;
            for record in records {
                println!("# {} ({})", record.id, record.saved_at.to_rfc3339());
                println!("{}", present::render_summary(&record.results));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { root } => {
            let cfg = config::load_or_default(&root).map_err(anyhow::Error::msg)?;
            print!("{}", toml::to_string_pretty(&cfg)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("read {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            Ok(buf)
        }
    }
}

/// JSON report for `extract`, and whether extraction succeeded.
fn extract_report(input: &str, expect: ExpectedShape) -> (serde_json::Value, bool) {
    match extract(input, expect) {
        Ok(found) => (json!({ "kind": found.kind, "value": found.value }), true),
        Err(reason) => (
            json!({ "error": reason.code(), "message": reason.to_string() }),
            false,
        ),
    }
}

fn build_request(kind: RequestKind, text: &str) -> anyhow::Result<GenerateRequest> {
    Ok(match kind {
        RequestKind::Writing => GenerateRequest::for_writing(check_writing_sample(text)?),
        RequestKind::Speaking => {
            let transcript = text.trim();
            anyhow::ensure!(!transcript.is_empty(), "transcript is empty");
            GenerateRequest::for_speaking(transcript)
        }
        RequestKind::Questions => {
            let count: usize = text
                .trim()
                .parse()
                .with_context(|| format!("question count `{text}`"))?;
            GenerateRequest::for_questions(count)
        }
    })
}

fn render_feedback(kind: RenderKind, input: &str) -> Result<String, String> {
    let found = extract(input, ExpectedShape::Object).map_err(|e| e.to_string())?;
    match kind {
        RenderKind::Writing => parse_as::<WritingFeedback>(&found)
            .map(|f| present::render_writing(&f))
            .map_err(|e| e.to_string()),
        RenderKind::Speaking => parse_as::<SpeakingFeedback>(&found)
            .map(|f| present::render_speaking(&f))
            .map_err(|e| e.to_string()),
    }
}

fn tokio_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start runtime")
}
