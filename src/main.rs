use clap::Parser;

mod agents;
mod api;
mod cache;
mod cli;
mod config;
mod coordinator;
mod error;
mod types;
mod utils;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    let exit_code = cli::run(args).await;
    std::process::exit(exit_code);
}
