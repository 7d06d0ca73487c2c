//! Binary crate for the `weather-server` HTTP API.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and interactive configuration
//! - Routing requests and resolving bearer tokens to accounts
//! - Mapping core errors onto HTTP statuses

use clap::Parser;

mod api_error;
mod cli;
mod routes;
mod server;
mod session;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cmd = cli::Cli::parse();
    cmd.run().await
}
