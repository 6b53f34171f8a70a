//! # verbforge CLI
//!
//! Command-line front end for the verbforge pipeline.
//!
//! Usage:
//!   verbforge generate <REQUIREMENTS>...
//!   verbforge generate --file requirements.txt
//!   verbforge examples
//!   verbforge report
//!   verbforge prompt <REQUIREMENTS>...
//!
//! Examples:
//!   verbforge generate "Make a simple English verb conjugator for present and past tense only."
//!   verbforge --provider openai --model gpt-4o-mini generate -f req.txt
//!   verbforge --output out report

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use verbforge_agents::{
    OutputLayout, ParserAgent, Pipeline, PipelineConfig, PipelineOutput, SAMPLE_REQUIREMENTS,
};
use verbforge_model::{Provider, ProviderConfig, ProviderType, RetryConfig, UsageReport};

#[derive(Parser)]
#[command(name = "verbforge")]
#[command(author, version, about = "verbforge - generate a verb conjugator app with a language model")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model provider: gemini, openai, anthropic or ollama
    #[arg(short, long, global = true, default_value = "gemini")]
    provider: String,

    /// Model name (defaults to the provider's default model)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Directory that receives generated/ and usage_report.json
    #[arg(short, long, global = true, default_value = ".")]
    output: PathBuf,

    /// Retries per model call for rate limits and transient failures
    #[arg(long, global = true, default_value = "3")]
    max_retries: u32,

    /// Enable debug logging and print the full usage report
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only print the status
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the conjugator, its UI and its tests
    Generate {
        /// Requirements text
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,

        /// Read the requirements from a file instead
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },
    /// Print sample requirement texts
    Examples {
        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the usage report of the last run
    Report,
    /// Print the parser prompt for some requirements without calling a model
    Prompt {
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    tracing::error!(error = %message, "verbforge failed");
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn build_provider(cli: &Cli) -> Provider {
    let provider_type: ProviderType = cli.provider.parse().unwrap_or_else(|e| fail(e));
    let mut config = ProviderConfig::from_env(provider_type).unwrap_or_else(|e| fail(e));
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    Provider::from_config(config).unwrap_or_else(|e| fail(e))
}

fn read_requirements(text: &[String], file: Option<&PathBuf>) -> String {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .unwrap_or_else(|e| fail(format!("cannot read {}: {}", path.display(), e))),
        None => text.join(" "),
    }
}

fn print_section(title: &str, body: &str) {
    println!("\n--- {} ---\n", title);
    println!("{}", body);
}

fn print_output(output: &PipelineOutput, quiet: bool) {
    if quiet {
        println!("{}", output.status);
        return;
    }
    print_section("STATUS", &output.status);
    if !output.is_success() {
        return;
    }
    print_section("GENERATED CODE", &output.code);
    print_section("TEST CASES", &output.tests);
    print_section("USAGE REPORT", &output.usage_report);
    print_section("INSTRUCTIONS", &output.instructions);
}

async fn run_generate(cli: &Cli, requirements: &str) {
    if requirements.trim().is_empty() {
        eprintln!("Error: No requirements provided.");
        eprintln!("Usage: verbforge generate <REQUIREMENTS>...");
        eprintln!("       verbforge generate --file <PATH>");
        eprintln!("\nTry `verbforge examples` for sample requirements.");
        std::process::exit(1);
    }

    let provider = build_provider(cli);
    let config = PipelineConfig::new(OutputLayout::new(&cli.output))
        .with_retry(RetryConfig::default().with_max_retries(cli.max_retries));

    if !cli.quiet {
        println!("verbforge - generating a verb conjugator\n");
    }

    let output = Pipeline::new(&provider, config).run(requirements).await;
    print_output(&output, cli.quiet);

    if !output.is_success() {
        tracing::error!(status = %output.status, "generation failed");
        std::process::exit(1);
    }
}

fn show_examples(json: bool) {
    if json {
        let text = serde_json::to_string_pretty(SAMPLE_REQUIREMENTS).unwrap_or_default();
        println!("{}", text);
        return;
    }
    for (i, sample) in SAMPLE_REQUIREMENTS.iter().enumerate() {
        println!("{}. {}", i + 1, sample);
    }
}

fn show_report(cli: &Cli) {
    let layout = OutputLayout::new(&cli.output);
    let path = layout.usage_report_path();
    let text = layout.read(&path).unwrap_or_else(|_| {
        fail(format!(
            "no usage report at {} (run `verbforge generate` first)",
            path.display()
        ))
    });
    let report = UsageReport::from_json(&text).unwrap_or_else(|e| fail(e));

    println!("{}", report.summary());
    if cli.verbose {
        print_section("RAW REPORT", &text);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Some(Commands::Generate { text, file }) => {
            let requirements = read_requirements(text, file.as_ref());
            run_generate(&cli, &requirements).await;
        }
        Some(Commands::Examples { json }) => show_examples(*json),
        Some(Commands::Report) => show_report(&cli),
        Some(Commands::Prompt { text }) => {
            println!("{}", ParserAgent::new().build_prompt(&text.join(" ")));
        }
        None => {
            eprintln!("Error: No command provided.");
            eprintln!("Usage: verbforge [OPTIONS] generate <REQUIREMENTS>...");
            eprintln!("       verbforge examples");
            eprintln!("       verbforge report");
            eprintln!("       verbforge prompt <REQUIREMENTS>...");
            eprintln!("\nExamples:");
            eprintln!("  verbforge generate \"{}\"", SAMPLE_REQUIREMENTS[2]);
            eprintln!("  verbforge --provider openai generate -f requirements.txt");
            eprintln!("  verbforge --help");
            std::process::exit(1);
        }
    }
}
