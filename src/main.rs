use clap::Parser;
use godo::cli::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    godo::cli::init_logging();
    godo::cli::run(cli).await
}
