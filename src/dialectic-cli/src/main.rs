//! Dialectic CLI - two AI interlocutors debate, a supervisor decides.
//!
//! Each intervention is printed and read aloud; the full debate is saved as
//! a PDF transcript.

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use dialectic_core::export::wrap_text;
use dialectic_core::{
    Config, DebateEngine, DebateError, DebateEvent, EventSink, Provider, RunOutcome, SpeechSink,
    Speaker, TranscriptPdf, build_generator, default_config, run_debate,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "dialectic",
    version,
    about = "AI debate generator - two interlocutors argue, a supervisor judges",
    long_about = "Runs a debate between two AI interlocutors defending opposite ideas, \
                  reads every intervention aloud and saves the transcript as a PDF."
)]
struct Cli {
    /// Number of interventions the debate will have (default 16)
    #[arg(short = 'n', long, value_name = "N")]
    debate_length: Option<u32>,

    /// The first idea that one interlocutor must defend
    #[arg(short = 'i', long, value_name = "IDEA")]
    idea1: String,

    /// The second idea that the other interlocutor must defend
    #[arg(short = 'j', long, value_name = "IDEA")]
    idea2: String,

    /// TOML file with prompts, voices and model settings
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for the PDF transcript and the audio file
    #[arg(short, long, default_value = "output", value_name = "DIR")]
    output_dir: PathBuf,

    /// Skip speech synthesis
    #[arg(long)]
    no_speech: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    if let Some(n) = cli.debate_length {
        config.debate.debate_length = n;
    }
    config.validate()?;

    let provider = Provider::from_env(&config.model)?;
    let generator = build_generator(&provider, &config.model)?;
    info!(model = %provider.model_name(), n = config.debate.debate_length, "debate starting");

    print_header(&cli, provider.model_name(), config.debate.debate_length);

    let engine = DebateEngine::new(generator, config.clone(), &cli.idea1, &cli.idea2)?;

    let mut console = ConsoleSink;
    let mut pdf = TranscriptPdf::new(&cli.output_dir);
    let mut speech = if cli.no_speech {
        None
    } else {
        Some(SpeechSink::new(&config.voices, &cli.output_dir).await?)
    };

    let mut sinks: Vec<&mut dyn EventSink> = Vec::with_capacity(3);
    sinks.push(&mut console);
    sinks.push(&mut pdf);
    if let Some(speech) = speech.as_mut() {
        sinks.push(speech);
    }
    let result = run_debate(engine, &mut sinks).await;
    drop(sinks);

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    match &result {
        Ok(state) => println!(
            "{}",
            format!(
                "  Debate concluded after {} interventions.",
                state.turn_count()
            )
            .bright_green()
            .bold()
        ),
        Err(e) => println!("{} {}", "  Debate aborted:".red().bold(), e),
    }
    if let Some(path) = pdf.written_path() {
        println!("  {} {}", "Transcript:".bold(), path.display());
    }
    if let Some(path) = speech.as_ref().and_then(|s| s.written_path()) {
        println!("  {} {}", "Audio:".bold(), path.display());
    }
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    result?;
    Ok(())
}

fn print_header(cli: &Cli, model: &str, debate_length: u32) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - Debate with supervisor", "Dialectic".bold())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!(
        "  {} {}",
        Speaker::Persona1.display_name().bright_cyan(),
        cli.idea1.bright_white()
    );
    println!(
        "  {} {}",
        Speaker::Persona2.display_name().yellow(),
        cli.idea2.bright_white()
    );
    println!(
        "  {} {} interventions, model {}",
        "Length:".bold(),
        debate_length,
        model.dimmed()
    );
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

/// Prints every intervention as it arrives.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn on_event(&mut self, event: &DebateEvent) -> Result<(), DebateError> {
        let name = event.speaker.display_name();
        let header = match event.speaker {
            Speaker::Persona1 => name.bright_cyan().bold(),
            Speaker::Persona2 => name.yellow().bold(),
            Speaker::Arbiter => name.bright_magenta().bold(),
        };

        println!();
        if event.speaker == Speaker::Arbiter {
            println!("{}", "═".repeat(70).bright_magenta());
        }
        println!("{} {}", "▶".bright_cyan(), header);
        for line in wrap_text(&event.text, 66) {
            println!("  {}", line);
        }
        Ok(())
    }

    fn finish(&mut self, outcome: RunOutcome) -> Result<(), DebateError> {
        if outcome == RunOutcome::Aborted {
            println!();
            println!("{}", "  Debate stopped before the verdict.".red());
        }
        Ok(())
    }
}
