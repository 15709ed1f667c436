//! rfcpub CLI: publish RFC drafts as wiki pages.
//!
//! Converts every markdown draft into its wiki-ready rendition through an
//! external converter, and optionally commits the result for CI.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    match commands::run(cli).await {
        Ok(()) => Ok(()),
        Err(report) => match commands::exit_code(&report) {
            Some(code) => {
                eprintln!("Error: {report:?}");
                std::process::exit(code);
            }
            None => Err(report),
        },
    }
}
