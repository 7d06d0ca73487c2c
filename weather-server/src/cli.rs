use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_core::Config;

use crate::server::run_server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather lookups and favorite locations over HTTP")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Address to bind, e.g. "0.0.0.0".
        #[arg(long)]
        bind: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// JSON file holding accounts and their favorites.
        #[arg(long)]
        accounts_file: Option<PathBuf>,
    },

    /// Store the OpenWeather API key and the token signing secret.
    Configure,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    fn save_config(&self, config: &Config) -> anyhow::Result<PathBuf> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => Config::config_file_path()?,
        };
        config.save_to(&path)?;
        Ok(path)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = self.load_config()?;

        match &self.command {
            Command::Serve {
                bind,
                port,
                accounts_file,
            } => {
                config.apply_env()?;
                if let Some(bind) = bind {
                    config.server.bind_address = bind.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if let Some(file) = accounts_file {
                    config.storage.accounts_file = Some(file.clone());
                }

                run_server(config).await
            }
            Command::Configure => {
                let api_key = prompt_secret("OpenWeather API key:")?;
                if !api_key.is_empty() {
                    config.set_openweather_api_key(api_key);
                }

                let secret = prompt_secret("Token signing secret:")?;
                if !secret.is_empty() {
                    config.auth.jwt_secret = Some(secret);
                }

                let path = self.save_config(&config)?;
                println!("Configuration saved to {}", path.display());
                Ok(())
            }
        }
    }
}

/// Masked prompt; an empty answer keeps the current value.
fn prompt_secret(message: &str) -> anyhow::Result<String> {
    Password::new(message)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("leave empty to keep the current value")
        .prompt()
        .context("Failed to read input")
}
