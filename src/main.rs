#![recursion_limit = "256"]

use anyhow::Result;
use attention_decoder::cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("attention_decoder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
