use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::load_last_session;
use crate::cli::output::get_formatter;
use crate::client::DaemonClient;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question about the uploaded documents")]
    pub question: String,

    #[arg(
        long,
        short = 's',
        help = "Session to ask against (defaults to the last session)"
    )]
    pub session: Option<String>,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim().to_string();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let session_id = args
        .session
        .or_else(load_last_session)
        .context("no active session; upload a document first")?;

    if verbose {
        eprintln!("Session:  {session_id}");
        eprintln!("Question: \"{question}\"");
    }

    let client = DaemonClient::new(&config);
    let start = Instant::now();
    let response = client.ask(session_id, question).await?;

    if verbose {
        eprintln!("Answered in {}ms", start.elapsed().as_millis());
        eprintln!();
    }

    print!("{}", formatter.format_answer(&response));

    Ok(())
}
