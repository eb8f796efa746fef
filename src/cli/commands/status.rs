use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::client::DaemonClient;
use crate::models::{Config, OutputFormat};

pub async fn handle_status(format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    if verbose {
        eprintln!("Socket: {}", config.socket_path().display());
    }

    let client = DaemonClient::new(&config);
    let info = if client.is_running() {
        match client.status().await {
            Ok(status) => StatusInfo {
                daemon_running: true,
                daemon: Some(status),
            },
            Err(_) => StatusInfo {
                daemon_running: false,
                daemon: None,
            },
        }
    } else {
        StatusInfo {
            daemon_running: false,
            daemon: None,
        }
    };

    print!("{}", formatter.format_status(&info));

    Ok(())
}
