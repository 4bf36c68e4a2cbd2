use clap::Parser;
use std::process::ExitCode;

use skrivpartner_lib::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    skrivpartner_lib::init_logging(cli.verbose);

    match skrivpartner_lib::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "command.failed");
            eprintln!("Fel: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
