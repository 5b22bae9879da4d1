use clap::Parser;
use run::{RunOptions, handle_run};
use serthru::error::ThruResult;

mod run;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    run: RunOptions,
}

fn main() -> ThruResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    handle_run(cli.run)?;

    Ok(())
}
