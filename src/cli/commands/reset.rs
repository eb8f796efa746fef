use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::load_last_session;
use crate::cli::output::get_formatter;
use crate::client::DaemonClient;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct ResetArgs {
    #[arg(
        long,
        short = 's',
        help = "Session to reset (defaults to the last session)"
    )]
    pub session: Option<String>,
}

pub async fn handle_reset(args: ResetArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let session_id = args
        .session
        .or_else(load_last_session)
        .context("no active session to reset")?;

    let client = DaemonClient::new(&config);
    if !client.is_running() {
        // Sessions live in the daemon; nothing survives it.
        print!("{}", formatter.format_message("Daemon is not running; nothing to reset"));
        return Ok(());
    }

    client.reset(session_id.clone()).await?;
    print!(
        "{}",
        formatter.format_message(&format!("Session {} reset", session_id))
    );

    Ok(())
}
