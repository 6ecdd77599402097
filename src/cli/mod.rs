// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to
// its use case. Printing happens here and nowhere else.
//
//   1. `init`        - build a model and save a checkpoint
//   2. `decode`      - beam search a file of token-id lines
//   3. `show-config` - print a checkpoint's model config
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DecodeArgs, InitArgs, ShowConfigArgs};

use crate::domain::traits::HypothesisSink;

#[derive(Parser, Debug)]
#[command(
    name = "attention-decoder",
    version = "0.1.0",
    about = "Bidirectional RNN encoder + attention decoder with beam search."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init(args)       => run_init(args),
            Commands::Decode(args)     => run_decode(args),
            Commands::ShowConfig(args) => run_show_config(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    use crate::application::init_use_case::InitUseCase;

    tracing::info!("Initialising model in: {}", args.checkpoint_dir);
    let dir = args.checkpoint_dir.clone();
    let cfg = InitUseCase::new(args.into()).execute()?;

    println!("Checkpoint saved to '{dir}'.");
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    use crate::application::decode_use_case::DecodeUseCase;
    use crate::infra::report::JsonlReport;

    let use_case = DecodeUseCase::new((&args).into());
    let mut report = args.report.as_deref().map(JsonlReport::create).transpose()?;

    let samples = use_case.execute(report.as_mut().map(|r| r as &mut dyn HypothesisSink))?;

    for sample in &samples {
        println!("[{}] {:?}", sample.index, sample.source.tokens);
        for (rank, hyp) in sample.hypotheses.iter().take(args.top).enumerate() {
            println!("    #{} score={:.4} {:?}", rank + 1, hyp.score, hyp.tokens);
        }
    }
    if let Some(report) = &report {
        println!("Report written to '{}'.", report.path().display());
    }
    Ok(())
}

fn run_show_config(args: ShowConfigArgs) -> Result<()> {
    use crate::infra::checkpoint::CheckpointManager;

    let cfg = CheckpointManager::new(&args.checkpoint_dir).load_config()?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}
