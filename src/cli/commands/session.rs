use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::load_last_session;
use crate::cli::output::get_formatter;
use crate::client::DaemonClient;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[arg(
        long,
        short = 's',
        help = "Session to inspect (defaults to the last session)"
    )]
    pub session: Option<String>,
}

pub async fn handle_session(args: SessionArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let session_id = args
        .session
        .or_else(load_last_session)
        .context("no active session; upload a document first")?;

    let client = DaemonClient::new(&config);
    if !client.is_running() {
        print!("{}", formatter.format_message("Daemon is not running"));
        return Ok(());
    }

    if verbose {
        eprintln!("Session: {session_id}");
    }

    let info = client.session_info(session_id).await?;
    print!("{}", formatter.format_session(&info));

    Ok(())
}
