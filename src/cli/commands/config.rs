use anyhow::Result;
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the active configuration
    Show,
    /// Write the default configuration file if none exists
    Init,
    /// Print the configuration file path
    Path,
}

pub async fn handle_config(
    command: ConfigCommand,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);

    match command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::Init => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            if path.exists() {
                print!(
                    "{}",
                    formatter.format_message(&format!(
                        "Config already exists: {}",
                        path.display()
                    ))
                );
            } else {
                Config::default().save()?;
                print!(
                    "{}",
                    formatter.format_message(&format!("Wrote defaults to {}", path.display()))
                );
            }
        }
        ConfigCommand::Path => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
